use std::path::Path;

use mupdf::{Document, Page, Rect, TextPageFlags};

use phishguard_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// Only this crate links mupdf (AGPL-3.0); the filter and ingestion crates
/// see pages through the [`PdfBackend`] trait alone.
///
/// Each page yields its text blocks in reading order, one `\n` per text
/// line, so headings stay on lines of their own. Bands at the top and bottom
/// of the page can be skipped to drop running headers and footers; both are
/// off by default since a heading near the page edge must still reach the
/// filter.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Fraction of page height, from the bottom, treated as footer.
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height, from the top, treated as header.
    header_exclusion_ratio: Option<f32>,
}

/// Vertical cut-offs for one page, in page coordinates.
#[derive(Debug, Clone, Copy)]
struct Bands {
    header_bottom: Option<f32>,
    footer_top: Option<f32>,
}

impl Bands {
    fn keeps(&self, block: &Rect) -> bool {
        let in_header = self.header_bottom.is_some_and(|y| block.y1 <= y);
        let in_footer = self.footer_top.is_some_and(|y| block.y0 >= y);
        !in_header && !in_footer
    }
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip blocks whose top edge lies in the bottom `ratio` of the page.
    /// `0.0` disables.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = (ratio > 0.0).then_some(ratio);
        self
    }

    /// Skip blocks lying entirely in the top `ratio` of the page. `0.0`
    /// disables.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = (ratio > 0.0).then_some(ratio);
        self
    }

    fn bands(&self, page: &Rect) -> Bands {
        let height = page.y1 - page.y0;
        Bands {
            header_bottom: self.header_exclusion_ratio.map(|r| page.y0 + height * r),
            footer_top: self.footer_exclusion_ratio.map(|r| page.y1 - height * r),
        }
    }

    fn page_text(&self, page: &Page) -> Result<String, mupdf::Error> {
        let bands = self.bands(&page.bounds()?);
        let text_page = page.to_text_page(TextPageFlags::empty())?;

        let mut text = String::new();
        for block in text_page.blocks().filter(|b| bands.keeps(&b.bounds())) {
            for line in block.lines() {
                text.extend(line.chars().map(|c| c.char().unwrap_or('\u{FFFD}')));
                text.push('\n');
            }
        }
        Ok(text)
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let extraction = |e: mupdf::Error| BackendError::ExtractionError(e.to_string());

        // Surface unreadable paths as I/O errors before mupdf flattens them.
        std::fs::File::open(path)?;

        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;
        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let pages = document
            .pages()
            .map_err(extraction)?
            .map(|page| self.page_text(&page?))
            .collect::<Result<Vec<_>, _>>()
            .map_err(extraction)?;

        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted PDF text");
        Ok(pages)
    }
}
