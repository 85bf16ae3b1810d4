use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod config_file;

pub use backend::{BackendError, PdfBackend};

/// Tag attached to every record produced from the phishing-paper corpus.
pub const DEFAULT_DOC_TYPE: &str = "phishing_paper";

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based position in the source document.
    pub index: usize,
    /// Raw extracted text, line breaks preserved.
    pub text: String,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// A PDF reduced to its ordered pages plus the identifiers carried into metadata.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Full path of the source file, as a string.
    pub source: String,
    pub filename: String,
    pub pages: Vec<Page>,
}

impl SourceDocument {
    /// Build a document from per-page texts in extraction order, numbering pages from 1.
    pub fn from_pages(path: &Path, texts: Vec<String>) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            source: path.display().to_string(),
            filename,
            pages: texts
                .into_iter()
                .enumerate()
                .map(|(i, text)| Page::new(i + 1, text))
                .collect(),
        }
    }
}

/// Metadata forwarded unchanged to the indexing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub source: String,
    pub filename: String,
    /// 1-based page index.
    pub page: usize,
    pub doc_type: String,
    /// 0-based chunk number within the page, when chunking is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<usize>,
}

/// A retained page (or chunk of one) ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub text: String,
    pub metadata: PageMetadata,
}
