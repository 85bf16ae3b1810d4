use std::path::{Path, PathBuf};

use crate::IngestError;

/// Returns true if the path has a `.pdf` extension (any case).
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Recursively collect the PDF files under `dir`, sorted by path.
///
/// Symlinked files are followed; symlinked directories are not, so a link
/// cycle cannot loop the walk.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::MissingDir(dir.to_path_buf()));
    }

    let mut found = Vec::new();
    walk(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk(&path, found)?;
        } else if (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
            && is_pdf_path(&path)
        {
            found.push(path);
        }
    }
    Ok(())
}
