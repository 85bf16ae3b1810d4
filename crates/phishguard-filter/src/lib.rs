use thiserror::Error;

pub mod config;
pub mod document;
pub mod section;
pub mod text_processing;

pub use config::{FilterConfig, FilterConfigBuilder, ListOverride};
pub use document::{
    DocumentState, FilterOutcome, FilterStats, PageDecision, PageFilter, PageVerdict,
    RetainedPage,
};
pub use section::{find_stop_point, looks_like_reference_list};
pub use text_processing::clean_text;
// Re-export domain types from core (canonical definitions live there)
pub use phishguard_core::Page;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("reference_line_ratio must be within 0.0..=1.0, got {0}")]
    InvalidRatio(f64),
}

/// Filter one document's pages and return the ones worth indexing.
///
/// Pipeline, per page in order:
/// 1. A standalone stop heading truncates the page to what precedes it and
///    closes the document
/// 2. Otherwise a page dense with citation lines is dropped and closes the document
/// 3. Otherwise the cleaned page is kept if it clears the minimum-length gate
///
/// Nothing after the closing page is retained.
pub fn process_document(pages: &[Page], config: &FilterConfig) -> Vec<RetainedPage> {
    filter_pages(pages, config).retained
}

/// Like [`process_document`], but also reports a decision for every page.
pub fn filter_pages(pages: &[Page], config: &FilterConfig) -> FilterOutcome {
    PageFilter::with_config(config.clone()).filter_pages(pages)
}
