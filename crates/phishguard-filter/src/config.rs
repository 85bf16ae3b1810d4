use regex::Regex;

use phishguard_core::config_file::FilterSection;

use crate::ConfigError;

/// Section titles that end the indexable part of a paper (English and French).
pub const DEFAULT_STOP_HEADINGS: &[&str] = &[
    "references",
    "bibliography",
    "références",
    "bibliographie",
    "references and notes",
];

/// Default fraction of citation-marker lines at which a page counts as a reference list.
pub const DEFAULT_REFERENCE_LINE_RATIO: f64 = 0.35;

/// Default number of non-blank lines below which the density heuristic abstains.
pub const DEFAULT_MIN_REFERENCE_LINES: usize = 10;

/// Default minimum cleaned length (in characters) for a page to be indexed.
pub const DEFAULT_MIN_PAGE_CHARS: usize = 150;

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// How stop headings are matched.
#[derive(Debug, Clone)]
pub(crate) enum HeadingMatcher {
    /// Precompiled pattern over [`DEFAULT_STOP_HEADINGS`].
    Builtin,
    Custom(Regex),
    /// The heading list resolved to nothing; no page is ever truncated.
    Disabled,
}

/// Immutable configuration for the reference-section filter.
///
/// Built-in patterns are represented as `None`/[`HeadingMatcher::Builtin`] and
/// resolved to shared statics at match time, so `FilterConfig::default()` never
/// compiles a regex. Use [`FilterConfigBuilder`] to change anything.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub(crate) stop_heading_matcher: HeadingMatcher,
    /// Resolved heading list, kept for display.
    pub(crate) stop_headings: Vec<String>,
    /// Regex recognising a citation line (`[1] `, `(1) `, `1. `).
    pub(crate) citation_line_re: Option<Regex>,
    pub(crate) min_reference_lines: usize,
    pub(crate) reference_line_ratio: f64,
    pub(crate) min_page_chars: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            stop_heading_matcher: HeadingMatcher::Builtin,
            stop_headings: DEFAULT_STOP_HEADINGS.iter().map(|h| h.to_string()).collect(),
            citation_line_re: None,
            min_reference_lines: DEFAULT_MIN_REFERENCE_LINES,
            reference_line_ratio: DEFAULT_REFERENCE_LINE_RATIO,
            min_page_chars: DEFAULT_MIN_PAGE_CHARS,
        }
    }
}

impl FilterConfig {
    pub fn stop_headings(&self) -> &[String] {
        &self.stop_headings
    }

    pub fn min_reference_lines(&self) -> usize {
        self.min_reference_lines
    }

    pub fn reference_line_ratio(&self) -> f64 {
        self.reference_line_ratio
    }

    pub fn min_page_chars(&self) -> usize {
        self.min_page_chars
    }
}

/// Build the standalone-line pattern for a set of headings.
///
/// Each heading must fill its line, give or take horizontal whitespace, and
/// matching is case-insensitive. Inner spaces of multi-word headings match any
/// run of horizontal whitespace. Returns `None` when no non-blank heading remains.
pub(crate) fn heading_pattern<S: AsRef<str>>(headings: &[S]) -> Option<String> {
    let alternatives: Vec<String> = headings
        .iter()
        .map(|h| {
            h.as_ref()
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[^\S\r\n]+")
        })
        .filter(|alt| !alt.is_empty())
        .collect();

    if alternatives.is_empty() {
        return None;
    }

    Some(format!(
        r"(?im)^[^\S\r\n]*(?:{})[^\S\r\n]*\r?$",
        alternatives.join("|")
    ))
}

/// Builder for [`FilterConfig`].
///
/// Accepts plain heading strings and a string citation pattern that are compiled
/// in [`build()`](Self::build). Fails fast on an invalid pattern or ratio.
#[derive(Debug, Clone, Default)]
pub struct FilterConfigBuilder {
    stop_headings: ListOverride<String>,
    citation_line_re: Option<String>,
    min_reference_lines: Option<usize>,
    reference_line_ratio: Option<f64>,
    min_page_chars: Option<usize>,
}

impl FilterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `[filter]` section of a config file.
    ///
    /// `stop_headings` replaces the defaults; `extra_stop_headings` is appended
    /// to whatever list results.
    pub fn from_section(section: &FilterSection) -> Self {
        let mut builder = Self::new();

        if let Some(headings) = &section.stop_headings {
            builder = builder.set_stop_headings(headings.clone());
        }
        for heading in section.extra_stop_headings.iter().flatten() {
            builder = builder.add_stop_heading(heading.clone());
        }
        if let Some(pattern) = &section.citation_line_pattern {
            builder = builder.citation_line_regex(pattern);
        }

        builder.min_reference_lines = section.min_reference_lines;
        builder.reference_line_ratio = section.reference_line_ratio;
        builder.min_page_chars = section.min_page_chars;
        builder
    }

    // ── Stop headings ──

    pub fn set_stop_headings(mut self, headings: Vec<String>) -> Self {
        self.stop_headings = ListOverride::Replace(headings);
        self
    }

    pub fn add_stop_heading(mut self, heading: String) -> Self {
        match &mut self.stop_headings {
            ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(heading),
            ListOverride::Default => self.stop_headings = ListOverride::Extend(vec![heading]),
        }
        self
    }

    // ── Reference-density heuristic ──

    pub fn citation_line_regex(mut self, pattern: &str) -> Self {
        self.citation_line_re = Some(pattern.to_string());
        self
    }

    pub fn min_reference_lines(mut self, n: usize) -> Self {
        self.min_reference_lines = Some(n);
        self
    }

    pub fn reference_line_ratio(mut self, ratio: f64) -> Self {
        self.reference_line_ratio = Some(ratio);
        self
    }

    // ── Length gate ──

    pub fn min_page_chars(mut self, n: usize) -> Self {
        self.min_page_chars = Some(n);
        self
    }

    /// Compile all patterns and produce a [`FilterConfig`].
    pub fn build(self) -> Result<FilterConfig, ConfigError> {
        let ratio = self
            .reference_line_ratio
            .unwrap_or(DEFAULT_REFERENCE_LINE_RATIO);
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::InvalidRatio(ratio));
        }

        let defaults: Vec<String> = DEFAULT_STOP_HEADINGS.iter().map(|h| h.to_string()).collect();
        let stop_headings = self.stop_headings.resolve(&defaults);

        let stop_heading_matcher = match self.stop_headings {
            ListOverride::Default => HeadingMatcher::Builtin,
            _ => match heading_pattern(&stop_headings) {
                Some(pattern) => HeadingMatcher::Custom(Regex::new(&pattern)?),
                None => HeadingMatcher::Disabled,
            },
        };

        Ok(FilterConfig {
            stop_heading_matcher,
            stop_headings,
            citation_line_re: self.citation_line_re.map(|p| Regex::new(&p)).transpose()?,
            min_reference_lines: self
                .min_reference_lines
                .unwrap_or(DEFAULT_MIN_REFERENCE_LINES),
            reference_line_ratio: ratio,
            min_page_chars: self.min_page_chars.unwrap_or(DEFAULT_MIN_PAGE_CHARS),
        })
    }
}
