use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub filter: Option<FilterSection>,
    pub ingest: Option<IngestSection>,
    pub pdf: Option<PdfSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSection {
    /// Replaces the built-in stop headings.
    pub stop_headings: Option<Vec<String>>,
    /// Appended to the stop headings (built-in or replaced).
    pub extra_stop_headings: Option<Vec<String>>,
    pub min_reference_lines: Option<usize>,
    pub reference_line_ratio: Option<f64>,
    pub min_page_chars: Option<usize>,
    pub citation_line_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSection {
    pub pdf_dir: Option<String>,
    pub output: Option<String>,
    pub workers: Option<usize>,
    pub doc_type: Option<String>,
    pub chunking: Option<bool>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub purge_sources: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfSection {
    pub header_exclusion: Option<f32>,
    pub footer_exclusion: Option<f32>,
}

/// Platform config directory path: `<config_dir>/phishguard/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("phishguard").join("config.toml"))
}

/// Load config by cascading CWD `.phishguard.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".phishguard.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_filter = base.filter.unwrap_or_default();
    let overlay_filter = overlay.filter.unwrap_or_default();
    let base_ingest = base.ingest.unwrap_or_default();
    let overlay_ingest = overlay.ingest.unwrap_or_default();
    let base_pdf = base.pdf.unwrap_or_default();
    let overlay_pdf = overlay.pdf.unwrap_or_default();

    ConfigFile {
        filter: Some(FilterSection {
            stop_headings: overlay_filter.stop_headings.or(base_filter.stop_headings),
            extra_stop_headings: overlay_filter
                .extra_stop_headings
                .or(base_filter.extra_stop_headings),
            min_reference_lines: overlay_filter
                .min_reference_lines
                .or(base_filter.min_reference_lines),
            reference_line_ratio: overlay_filter
                .reference_line_ratio
                .or(base_filter.reference_line_ratio),
            min_page_chars: overlay_filter.min_page_chars.or(base_filter.min_page_chars),
            citation_line_pattern: overlay_filter
                .citation_line_pattern
                .or(base_filter.citation_line_pattern),
        }),
        ingest: Some(IngestSection {
            pdf_dir: overlay_ingest.pdf_dir.or(base_ingest.pdf_dir),
            output: overlay_ingest.output.or(base_ingest.output),
            workers: overlay_ingest.workers.or(base_ingest.workers),
            doc_type: overlay_ingest.doc_type.or(base_ingest.doc_type),
            chunking: overlay_ingest.chunking.or(base_ingest.chunking),
            chunk_size: overlay_ingest.chunk_size.or(base_ingest.chunk_size),
            chunk_overlap: overlay_ingest.chunk_overlap.or(base_ingest.chunk_overlap),
            purge_sources: overlay_ingest.purge_sources.or(base_ingest.purge_sources),
        }),
        pdf: Some(PdfSection {
            header_exclusion: overlay_pdf.header_exclusion.or(base_pdf.header_exclusion),
            footer_exclusion: overlay_pdf.footer_exclusion.or(base_pdf.footer_exclusion),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_section_round_trip_toml() {
        let config = ConfigFile {
            filter: Some(FilterSection {
                extra_stop_headings: Some(vec!["works cited".to_string()]),
                reference_line_ratio: Some(0.4),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        let filter = parsed.filter.unwrap();
        assert_eq!(filter.extra_stop_headings.unwrap(), vec!["works cited"]);
        assert_eq!(filter.reference_line_ratio, Some(0.4));
        assert!(filter.stop_headings.is_none());
    }

    #[test]
    fn absent_sections_deserialize_as_none() {
        let toml_str = "[ingest]\npdf_dir = \"papers\"\nchunk_size = 400\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert!(parsed.filter.is_none());
        assert!(parsed.pdf.is_none());
        let ingest = parsed.ingest.unwrap();
        assert_eq!(ingest.pdf_dir.as_deref(), Some("papers"));
        assert_eq!(ingest.chunk_size, Some(400));
        assert!(ingest.chunk_overlap.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            ingest: Some(IngestSection {
                output: Some("/base/out.jsonl".to_string()),
                workers: Some(2),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            ingest: Some(IngestSection {
                output: Some("/overlay/out.jsonl".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay).ingest.unwrap();
        assert_eq!(merged.output.as_deref(), Some("/overlay/out.jsonl"));
        assert_eq!(merged.workers, Some(2));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            pdf: Some(PdfSection {
                footer_exclusion: Some(0.05),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.pdf.unwrap().footer_exclusion, Some(0.05));
    }

    #[test]
    fn load_from_path_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("nope.toml")).is_none());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[filter\nmin_page_chars = ").unwrap();
        assert!(load_from_path(&bad).is_none());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[filter]\nmin_page_chars = 200\n").unwrap();
        let parsed = load_from_path(&good).unwrap();
        assert_eq!(parsed.filter.unwrap().min_page_chars, Some(200));
    }
}
