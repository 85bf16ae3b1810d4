use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors only pull raw text out of the file; deciding which pages are
/// worth indexing is the job of `phishguard_filter`.
pub trait PdfBackend: Send + Sync {
    /// Extract the text of every page, in document order.
    ///
    /// Page text keeps its line breaks: the stop-heading detector matches
    /// headings as standalone lines.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError>;
}
