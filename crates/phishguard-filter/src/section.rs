use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{DEFAULT_STOP_HEADINGS, FilterConfig, HeadingMatcher, heading_pattern};

static STOP_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = heading_pattern(DEFAULT_STOP_HEADINGS).expect("default headings are non-empty");
    Regex::new(&pattern).unwrap()
});

/// `[12] `, `(12) ` or `12. ` at the start of a line.
static CITATION_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\[\d+\]|\(\d+\)|\d+\.)\s+").unwrap());

/// Locate the start of a references/bibliography section in a page.
///
/// A heading only counts when it stands on its own line (surrounding
/// whitespace allowed, case ignored). A sentence that merely mentions
/// "references" does not qualify. Returns the byte offset of the start of the
/// first matching line, so `&text[..offset]` is the indexable prefix.
pub fn find_stop_point(text: &str) -> Option<usize> {
    find_stop_point_with_config(text, &FilterConfig::default())
}

/// Config-aware version of [`find_stop_point`].
pub(crate) fn find_stop_point_with_config(text: &str, config: &FilterConfig) -> Option<usize> {
    let re = match &config.stop_heading_matcher {
        HeadingMatcher::Builtin => &*STOP_HEADING_RE,
        HeadingMatcher::Custom(re) => re,
        HeadingMatcher::Disabled => return None,
    };
    re.find(text).map(|m| m.start())
}

/// Decide whether a page is predominantly a numbered citation list.
///
/// Pages with fewer than `min_reference_lines` non-blank lines never qualify;
/// otherwise the page is a reference list when at least `reference_line_ratio`
/// of its lines start with a citation marker.
pub fn looks_like_reference_list(text: &str) -> bool {
    looks_like_reference_list_with_config(text, &FilterConfig::default())
}

/// Config-aware version of [`looks_like_reference_list`].
pub(crate) fn looks_like_reference_list_with_config(text: &str, config: &FilterConfig) -> bool {
    let lines = non_blank_lines(text);
    if lines.len() < config.min_reference_lines {
        return false;
    }

    let citation_re = config.citation_line_re.as_ref().unwrap_or(&CITATION_LINE_RE);
    let ref_like = lines.iter().filter(|l| citation_re.is_match(l)).count();

    ref_like as f64 / lines.len().max(1) as f64 >= config.reference_line_ratio
}

/// Trimmed non-blank lines. Besides `\n` and `\r`, the vertical tab, form feed,
/// file/group/record separators and Unicode line/paragraph separators also end a
/// line; PDF extraction emits form feeds between columns now and then.
fn non_blank_lines(text: &str) -> Vec<&str> {
    text.split(|c: char| {
        matches!(
            c,
            '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
        )
    })
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilterConfigBuilder;

    fn citation_page(citations: usize, total: usize) -> String {
        (0..total)
            .map(|i| {
                if i < citations {
                    format!("[{}] A. Author. Phishing detection at scale. 2021.", i + 1)
                } else {
                    "Body text about credential harvesting campaigns.".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_stop_point_standalone_heading() {
        let text = "Intro text.\nReferences\n[1] Someone.";
        assert_eq!(find_stop_point(text), Some(12));
        assert_eq!(&text[..12], "Intro text.\n");
    }

    #[test]
    fn test_stop_point_at_string_start_and_end() {
        assert_eq!(find_stop_point("Bibliography\n[1] x"), Some(0));
        assert_eq!(find_stop_point("Body\nREFERENCES"), Some(5));
    }

    #[test]
    fn test_stop_point_with_surrounding_whitespace() {
        let text = "Body.\n   References  \t\n[1] x";
        assert_eq!(find_stop_point(text), Some(6));
    }

    #[test]
    fn test_stop_point_crlf() {
        let text = "Body.\r\nReferences\r\n[1] x";
        assert_eq!(find_stop_point(text), Some(7));
    }

    #[test]
    fn test_stop_point_french_headings() {
        assert_eq!(find_stop_point("Conclusion.\nRéférences\n"), Some(12));
        assert_eq!(find_stop_point("Conclusion.\nBIBLIOGRAPHIE\n"), Some(12));
        // Case folding of the accented letters.
        assert_eq!(find_stop_point("Conclusion.\nRÉFÉRENCES\n"), Some(12));
    }

    #[test]
    fn test_stop_point_multiword_heading() {
        let text = "Body.\nReferences   and Notes\n1. x";
        assert_eq!(find_stop_point(text), Some(6));
    }

    #[test]
    fn test_stop_point_ignores_inline_mentions() {
        assert_eq!(find_stop_point("See the references below for details."), None);
        assert_eq!(find_stop_point("Cross-references\nare resolved later."), None);
        assert_eq!(find_stop_point("The bibliography was long\n"), None);
        assert_eq!(find_stop_point("preferences\n"), None);
    }

    #[test]
    fn test_stop_point_earliest_heading_wins() {
        let text = "Body.\nBibliography\nmore\nReferences\n";
        assert_eq!(find_stop_point(text), Some(6));
    }

    #[test]
    fn test_stop_point_offset_is_char_boundary() {
        let text = "Résumé des tâches.\nRéférences\n";
        let offset = find_stop_point(text).unwrap();
        assert!(text.is_char_boundary(offset));
        assert_eq!(&text[..offset], "Résumé des tâches.\n");
    }

    #[test]
    fn test_stop_point_custom_headings() {
        let config = FilterConfigBuilder::new()
            .set_stop_headings(vec!["Literaturverzeichnis".to_string()])
            .build()
            .unwrap();
        let text = "Text.\nLiteraturverzeichnis\nReferences\n";
        assert_eq!(find_stop_point_with_config(text, &config), Some(6));
        assert_eq!(find_stop_point_with_config("Text.\nReferences\n", &config), None);
    }

    #[test]
    fn test_stop_point_empty() {
        assert_eq!(find_stop_point(""), None);
    }

    #[test]
    fn test_reference_list_density_threshold() {
        assert!(looks_like_reference_list(&citation_page(8, 20)));
        assert!(!looks_like_reference_list(&citation_page(6, 20)));
    }

    #[test]
    fn test_reference_list_needs_enough_lines() {
        // 9 lines, all citations.
        assert!(!looks_like_reference_list(&citation_page(9, 9)));
        assert!(looks_like_reference_list(&citation_page(10, 10)));
    }

    #[test]
    fn test_reference_list_blank_lines_ignored() {
        let page = citation_page(8, 20).replace('\n', "\n\n   \n");
        assert!(looks_like_reference_list(&page));
    }

    #[test]
    fn test_reference_list_marker_styles() {
        let mut lines = vec![
            "(1) Parenthesised citation.".to_string(),
            "2. Numbered citation.".to_string(),
            "   [3]   Indented bracket citation.".to_string(),
            "[4] Bracket citation.".to_string(),
        ];
        lines.extend((0..6).map(|_| "Ordinary prose line.".to_string()));
        // 4 / 10 = 0.40
        assert!(looks_like_reference_list(&lines.join("\n")));
    }

    #[test]
    fn test_reference_list_marker_needs_trailing_space() {
        let mut lines: Vec<String> = (0..4).map(|i| format!("[{i}]")).collect();
        lines.extend((0..6).map(|i| format!("3.{i}% of users clicked")));
        assert!(!looks_like_reference_list(&lines.join("\n")));
    }

    #[test]
    fn test_reference_list_form_feed_splits_lines() {
        let page = citation_page(8, 20).replace('\n', "\x0c");
        assert!(looks_like_reference_list(&page));
    }

    #[test]
    fn test_reference_list_custom_config() {
        let config = FilterConfigBuilder::new()
            .min_reference_lines(4)
            .reference_line_ratio(0.5)
            .build()
            .unwrap();
        assert!(looks_like_reference_list_with_config(
            &citation_page(2, 4),
            &config
        ));
        assert!(!looks_like_reference_list_with_config(
            &citation_page(1, 4),
            &config
        ));
    }

    #[test]
    fn test_reference_list_custom_marker() {
        let config = FilterConfigBuilder::new()
            .citation_line_regex(r"^[A-Z][a-z]+, [A-Z]\.")
            .build()
            .unwrap();
        let page = (0..10)
            .map(|_| "Smith, J. 2020. Phishing kits in the wild.")
            .collect::<Vec<_>>()
            .join("\n");
        assert!(looks_like_reference_list_with_config(&page, &config));
        assert!(!looks_like_reference_list(&page));
    }

    #[test]
    fn test_reference_list_empty() {
        assert!(!looks_like_reference_list(""));
    }
}
