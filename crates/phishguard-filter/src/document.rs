use phishguard_core::Page;

use crate::config::FilterConfig;
use crate::section::{find_stop_point_with_config, looks_like_reference_list_with_config};
use crate::text_processing::{char_len, clean_text};

/// Per-document filter state. `Closed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Open,
    Closed { at_page: usize },
}

/// What the filter did with one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    /// Kept in full; `chars` is the cleaned length.
    Retained { chars: usize },
    /// Below the minimum-length gate.
    TooShort { chars: usize },
    /// A stop heading starts at `offset`; the prefix before it was kept if
    /// `retained`. Closes the document.
    TruncatedAtHeading { offset: usize, retained: bool },
    /// Dense citation list. Dropped, closes the document.
    ReferenceList,
    /// Reached after the document closed.
    AfterClose,
}

impl PageDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retained { .. } => "retained",
            Self::TooShort { .. } => "too_short",
            Self::TruncatedAtHeading { .. } => "stop_heading",
            Self::ReferenceList => "reference_list",
            Self::AfterClose => "after_close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVerdict {
    pub index: usize,
    pub decision: PageDecision,
}

/// A page that passed the filter, with its cleaned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedPage {
    pub index: usize,
    pub text: String,
}

/// Decision counts for one document or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub pages: usize,
    pub retained: usize,
    pub too_short: usize,
    pub truncated_at_heading: usize,
    pub reference_list: usize,
    pub after_close: usize,
}

impl FilterStats {
    pub fn record(&mut self, decision: &PageDecision) {
        self.pages += 1;
        match decision {
            PageDecision::Retained { .. } => self.retained += 1,
            PageDecision::TooShort { .. } => self.too_short += 1,
            PageDecision::TruncatedAtHeading { retained, .. } => {
                self.truncated_at_heading += 1;
                if *retained {
                    self.retained += 1;
                }
            }
            PageDecision::ReferenceList => self.reference_list += 1,
            PageDecision::AfterClose => self.after_close += 1,
        }
    }

    pub fn merge(&mut self, other: &FilterStats) {
        self.pages += other.pages;
        self.retained += other.retained;
        self.too_short += other.too_short;
        self.truncated_at_heading += other.truncated_at_heading;
        self.reference_list += other.reference_list;
        self.after_close += other.after_close;
    }
}

/// Result of filtering one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub retained: Vec<RetainedPage>,
    /// One verdict per input page, in input order.
    pub decisions: Vec<PageVerdict>,
    pub state: DocumentState,
}

impl FilterOutcome {
    /// Index of the page that closed the document, if any.
    pub fn closed_at(&self) -> Option<usize> {
        match self.state {
            DocumentState::Open => None,
            DocumentState::Closed { at_page } => Some(at_page),
        }
    }

    pub fn stats(&self) -> FilterStats {
        let mut stats = FilterStats::default();
        for verdict in &self.decisions {
            stats.record(&verdict.decision);
        }
        stats
    }
}

/// The reference-section filter.
///
/// Holds a [`FilterConfig`] and exposes each heuristic as a method. Stateless
/// across documents, so one instance can be shared between workers.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    config: FilterConfig,
}

impl PageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn find_stop_point(&self, text: &str) -> Option<usize> {
        find_stop_point_with_config(text, &self.config)
    }

    pub fn looks_like_reference_list(&self, text: &str) -> bool {
        looks_like_reference_list_with_config(text, &self.config)
    }

    /// Run one document's pages through the filter, in order.
    ///
    /// A stop heading truncates its page and closes the document; a page that
    /// reads as a citation list is dropped and closes it. Pages after the close
    /// are never examined.
    pub fn filter_pages(&self, pages: &[Page]) -> FilterOutcome {
        let mut state = DocumentState::Open;
        let mut retained = Vec::new();
        let mut decisions = Vec::with_capacity(pages.len());

        for page in pages {
            let decision = match state {
                DocumentState::Closed { .. } => PageDecision::AfterClose,
                DocumentState::Open => {
                    let (decision, kept) = self.examine(page);
                    if let Some(text) = kept {
                        retained.push(RetainedPage {
                            index: page.index,
                            text,
                        });
                    }
                    if matches!(
                        decision,
                        PageDecision::TruncatedAtHeading { .. } | PageDecision::ReferenceList
                    ) {
                        state = DocumentState::Closed {
                            at_page: page.index,
                        };
                    }
                    decision
                }
            };
            decisions.push(PageVerdict {
                index: page.index,
                decision,
            });
        }

        FilterOutcome {
            retained,
            decisions,
            state,
        }
    }

    /// Retained pages only.
    pub fn process_document(&self, pages: &[Page]) -> Vec<RetainedPage> {
        self.filter_pages(pages).retained
    }

    /// Decide a single page of an open document.
    fn examine(&self, page: &Page) -> (PageDecision, Option<String>) {
        if let Some(offset) = self.find_stop_point(&page.text) {
            let kept = self.gate(clean_text(&page.text[..offset]));
            let decision = PageDecision::TruncatedAtHeading {
                offset,
                retained: kept.is_some(),
            };
            return (decision, kept);
        }

        if self.looks_like_reference_list(&page.text) {
            return (PageDecision::ReferenceList, None);
        }

        let cleaned = clean_text(&page.text);
        let chars = char_len(&cleaned);
        match self.gate(cleaned) {
            Some(text) => (PageDecision::Retained { chars }, Some(text)),
            None => (PageDecision::TooShort { chars }, None),
        }
    }

    fn gate(&self, cleaned: String) -> Option<String> {
        (char_len(&cleaned) >= self.config.min_page_chars).then_some(cleaned)
    }
}
