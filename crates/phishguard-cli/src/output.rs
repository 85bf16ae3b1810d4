use std::io::Write;
use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use phishguard_filter::{DocumentState, FilterStats, PageDecision, PageVerdict};
use phishguard_ingest::{DocumentReport, IngestError};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Totals for one `ingest` run.
#[derive(Debug)]
pub struct IngestSummary {
    pub pdfs: usize,
    /// PDFs extracted and filtered successfully.
    pub documents: usize,
    pub failed: usize,
    pub records: usize,
    /// `None` when purging was disabled.
    pub purged: Option<usize>,
    pub stats: FilterStats,
    pub output: PathBuf,
}

/// Print a document that could not be ingested.
pub fn print_failure(
    w: &mut dyn Write,
    path: &Path,
    error: &IngestError,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {}", "SKIPPED:".yellow(), path.display(), error)?;
    } else {
        writeln!(w, "SKIPPED: {}: {}", path.display(), error)?;
    }
    Ok(())
}

/// Print the final summary of an ingest run.
pub fn print_ingest_summary(
    w: &mut dyn Write,
    summary: &IngestSummary,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  PDFs found: {}", summary.pdfs)?;
    writeln!(w, "  PDFs ingested: {}", summary.documents)?;
    if summary.failed > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Failed:".red(), summary.failed)?;
        } else {
            writeln!(w, "  Failed: {}", summary.failed)?;
        }
    }
    writeln!(w)?;

    print_stats(w, &summary.stats, color)?;
    writeln!(w)?;

    if color.enabled() {
        writeln!(
            w,
            "  {} {} (page-level, filtered)",
            "Docs written:".green(),
            summary.records
        )?;
    } else {
        writeln!(w, "  Docs written: {} (page-level, filtered)", summary.records)?;
    }
    if let Some(purged) = summary.purged {
        let msg = format!("Purged {} stale records", purged);
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    writeln!(w, "  Output: {}", summary.output.display())?;

    writeln!(w)?;
    Ok(())
}

/// Print the run totals when every page of every PDF was filtered out.
pub fn print_no_docs(
    w: &mut dyn Write,
    pdfs: usize,
    purged: Option<usize>,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "PDFs: {}", pdfs)?;
    writeln!(w, "Docs (page-level, filtered): 0")?;
    if let Some(purged) = purged
        && purged > 0
    {
        writeln!(w, "Purged {} stale records", purged)?;
    }
    if color.enabled() {
        writeln!(w, "{}", "No docs extracted (after filtering).".yellow())?;
    } else {
        writeln!(w, "No docs extracted (after filtering).")?;
    }
    Ok(())
}

fn print_stats(w: &mut dyn Write, stats: &FilterStats, color: ColorMode) -> std::io::Result<()> {
    writeln!(w, "  Pages seen: {}", stats.pages)?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Retained:".green(), stats.retained)?;
    } else {
        writeln!(w, "  Retained: {}", stats.retained)?;
    }

    let dropped = [
        ("Too short", stats.too_short),
        ("Stop heading", stats.truncated_at_heading),
        ("Reference list", stats.reference_list),
        ("After references", stats.after_close),
    ];
    for (label, count) in dropped {
        if count == 0 {
            continue;
        }
        let msg = format!("{}: {}", label, count);
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }
    Ok(())
}

/// Print every page decision of one document, then where it closed.
pub fn print_inspect_report(
    w: &mut dyn Write,
    report: &DocumentReport,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} pages)\n",
            "INSPECT:".bold().cyan(),
            report.filename.bold(),
            report.stats.pages
        )?;
    } else {
        writeln!(
            w,
            "INSPECT: {} ({} pages)\n",
            report.filename, report.stats.pages
        )?;
    }

    for verdict in &report.decisions {
        print_verdict(w, verdict, color)?;
    }
    writeln!(w)?;

    match report.state {
        DocumentState::Closed { at_page } => {
            writeln!(w, "Reference section starts on page {}", at_page)?
        }
        DocumentState::Open => writeln!(w, "No reference section detected")?,
    }
    writeln!(
        w,
        "Retained {} of {} pages",
        report.stats.retained, report.stats.pages
    )?;

    Ok(())
}

fn print_verdict(w: &mut dyn Write, verdict: &PageVerdict, color: ColorMode) -> std::io::Result<()> {
    let label = format!("[page {}]", verdict.index);
    let detail = match verdict.decision {
        PageDecision::Retained { chars } => format!("retained ({} chars)", chars),
        PageDecision::TooShort { chars } => format!("too short ({} chars)", chars),
        PageDecision::TruncatedAtHeading {
            offset,
            retained: true,
        } => format!("stop heading at byte {}, text before it retained", offset),
        PageDecision::TruncatedAtHeading {
            offset,
            retained: false,
        } => format!("stop heading at byte {}, text before it too short", offset),
        PageDecision::ReferenceList => "reference list".to_string(),
        PageDecision::AfterClose => "after references".to_string(),
    };

    if !color.enabled() {
        writeln!(w, "{} {}", label, detail)?;
        return Ok(());
    }

    let detail = match verdict.decision {
        PageDecision::Retained { .. } | PageDecision::TruncatedAtHeading { retained: true, .. } => {
            detail.green().to_string()
        }
        PageDecision::TooShort { .. } => detail.yellow().to_string(),
        PageDecision::TruncatedAtHeading { .. } | PageDecision::ReferenceList => {
            detail.red().to_string()
        }
        PageDecision::AfterClose => detail.dimmed().to_string(),
    };
    writeln!(w, "{} {}", label.bold(), detail)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DocumentReport {
        let decisions = vec![
            PageVerdict {
                index: 1,
                decision: PageDecision::Retained { chars: 420 },
            },
            PageVerdict {
                index: 2,
                decision: PageDecision::TruncatedAtHeading {
                    offset: 88,
                    retained: false,
                },
            },
            PageVerdict {
                index: 3,
                decision: PageDecision::AfterClose,
            },
        ];
        let mut stats = FilterStats::default();
        for v in &decisions {
            stats.record(&v.decision);
        }
        DocumentReport {
            source: "data/lures.pdf".to_string(),
            filename: "lures.pdf".to_string(),
            records: Vec::new(),
            decisions,
            stats,
            state: DocumentState::Closed { at_page: 2 },
        }
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_inspect_report_plain() {
        let out = render(|w| print_inspect_report(w, &report(), ColorMode(false)));
        assert!(out.starts_with("INSPECT: lures.pdf (3 pages)"));
        assert!(out.contains("[page 1] retained (420 chars)"));
        assert!(out.contains("[page 2] stop heading at byte 88, text before it too short"));
        assert!(out.contains("[page 3] after references"));
        assert!(out.contains("Reference section starts on page 2"));
        assert!(out.contains("Retained 1 of 3 pages"));
    }

    #[test]
    fn test_summary_plain() {
        let summary = IngestSummary {
            pdfs: 2,
            documents: 1,
            failed: 1,
            records: 4,
            purged: Some(3),
            stats: report().stats,
            output: PathBuf::from("documents.jsonl"),
        };
        let out = render(|w| print_ingest_summary(w, &summary, ColorMode(false)));
        assert!(out.contains("PDFs found: 2"));
        assert!(out.contains("Failed: 1"));
        assert!(out.contains("Stop heading: 1"));
        assert!(!out.contains("Reference list:"));
        assert!(out.contains("Docs written: 4 (page-level, filtered)"));
        assert!(out.contains("Purged 3 stale records"));
    }

    #[test]
    fn test_no_docs_prints_counts_first() {
        let out = render(|w| print_no_docs(w, 3, Some(2), ColorMode(false)));
        assert_eq!(
            out,
            "PDFs: 3\nDocs (page-level, filtered): 0\nPurged 2 stale records\nNo docs extracted (after filtering).\n"
        );

        let out = render(|w| print_no_docs(w, 1, None, ColorMode(false)));
        assert!(!out.contains("Purged"));
    }

    #[test]
    fn test_failure_line() {
        let err = IngestError::Worker("panicked".to_string());
        let out = render(|w| print_failure(w, Path::new("bad.pdf"), &err, ColorMode(false)));
        assert_eq!(out, "SKIPPED: bad.pdf: worker failed: panicked\n");
    }
}
