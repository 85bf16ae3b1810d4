use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use phishguard_core::PdfBackend;
use phishguard_core::config_file::{self, ConfigFile};
use phishguard_filter::{FilterConfigBuilder, FilterStats, PageFilter};
use phishguard_ingest::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use phishguard_ingest::{
    ChunkConfig, DEFAULT_DOC_TYPE, DocumentReport, IndexSink, IngestConfig, IngestError, JsonlSink,
    discover_pdfs, ingest_document, ingest_stream,
};
use phishguard_pdf_mupdf::MupdfBackend;

mod output;

use output::{ColorMode, IngestSummary};

/// PhishGuard corpus ingestion - index phishing research PDFs without their reference sections
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, filter and write every PDF under a directory as JSON Lines
    Ingest(IngestArgs),

    /// Show the per-page filter decisions for one PDF without writing anything
    Inspect {
        /// Path to the PDF to inspect
        file_path: PathBuf,

        /// Minimum cleaned page length, in characters
        #[arg(long)]
        min_page_chars: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Directory searched recursively for PDFs [env: PDF_DIR, default: data]
    pdf_dir: Option<PathBuf>,

    /// JSON Lines output file [env: INGEST_OUTPUT, default: documents.jsonl]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Documents processed in parallel [env: INGEST_WORKERS]
    #[arg(long)]
    workers: Option<usize>,

    /// Chunk size in words [env: CHUNK_SIZE, default: 650]
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Words carried between consecutive chunks [env: CHUNK_OVERLAP, default: 120]
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Write one record per retained page instead of chunking
    #[arg(long)]
    no_chunk: bool,

    /// Keep records already written for the ingested sources [env: PURGE_SOURCES]
    #[arg(long)]
    no_purge: bool,

    /// Value of `metadata.doc_type` on every record
    #[arg(long)]
    doc_type: Option<String>,

    /// Minimum cleaned page length, in characters
    #[arg(long)]
    min_page_chars: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => ingest(args).await,
        Command::Inspect {
            file_path,
            min_page_chars,
            no_color,
        } => inspect(file_path, min_page_chars, no_color),
    }
}

/// Logs go to stderr so stdout only carries the report.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let config = config_file::load_config();
    let section = config.ingest.clone().unwrap_or_default();

    let pdf_dir = args
        .pdf_dir
        .or_else(|| std::env::var("PDF_DIR").ok().map(PathBuf::from))
        .or_else(|| section.pdf_dir.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));
    let output_path = args
        .output
        .or_else(|| std::env::var("INGEST_OUTPUT").ok().map(PathBuf::from))
        .or_else(|| section.output.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("documents.jsonl"));
    let workers = args
        .workers
        .or_else(|| env_parse("INGEST_WORKERS"))
        .or(section.workers)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
    let chunk_size = args
        .chunk_size
        .or_else(|| env_parse("CHUNK_SIZE"))
        .or(section.chunk_size)
        .unwrap_or(DEFAULT_CHUNK_SIZE);
    let chunk_overlap = args
        .chunk_overlap
        .or_else(|| env_parse("CHUNK_OVERLAP"))
        .or(section.chunk_overlap)
        .unwrap_or(DEFAULT_CHUNK_OVERLAP);
    let purge = !args.no_purge
        && std::env::var("PURGE_SOURCES")
            .ok()
            .map(|v| parse_flag(&v))
            .or(section.purge_sources)
            .unwrap_or(true);
    let doc_type = args
        .doc_type
        .or_else(|| section.doc_type.clone())
        .unwrap_or_else(|| DEFAULT_DOC_TYPE.to_string());

    if workers == 0 {
        anyhow::bail!("workers must be at least 1");
    }
    if chunk_size == 0 {
        anyhow::bail!("chunk size must be at least 1 word");
    }

    let chunking = (!args.no_chunk && section.chunking.unwrap_or(true)).then_some(ChunkConfig {
        chunk_size,
        overlap: chunk_overlap,
    });
    let ingest_config = IngestConfig {
        filter: build_filter(&config, args.min_page_chars)?,
        doc_type,
        chunking,
    };
    let backend: Arc<dyn PdfBackend> = Arc::new(build_backend(&config));

    tracing::info!(
        pdf_dir = %pdf_dir.display(),
        output = %output_path.display(),
        workers,
        chunking = ?ingest_config.chunking,
        purge,
        "resolved ingest settings"
    );

    let color = ColorMode(!args.no_color);
    let mut writer = std::io::stdout();

    let paths = discover_pdfs(&pdf_dir)?;
    if paths.is_empty() {
        writeln!(writer, "No PDFs in {}", pdf_dir.display())?;
        return Ok(());
    }

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let bar = progress_bar(paths.len() as u64)?;
    let pdfs = paths.len();
    let mut reports = Vec::with_capacity(pdfs);
    let mut stats = FilterStats::default();
    let mut failed = 0;

    let stream = ingest_stream(
        paths,
        backend,
        Arc::new(ingest_config),
        workers,
        cancel.clone(),
    );
    let mut stream = std::pin::pin!(stream);
    while let Some((path, result)) = stream.next().await {
        bar.inc(1);
        if let Some(name) = path.file_name() {
            bar.set_message(name.to_string_lossy().to_string());
        }
        match result {
            Ok(report) => {
                stats.merge(&report.stats);
                reports.push(report);
            }
            Err(IngestError::Cancelled) => {}
            Err(e) => {
                failed += 1;
                bar.suspend(|| output::print_failure(&mut writer, &path, &e, color))?;
            }
        }
    }
    bar.finish_and_clear();

    if cancel.is_cancelled() {
        anyhow::bail!("Interrupted; nothing was written to {}", output_path.display());
    }

    let records: usize = reports.iter().map(|r| r.records.len()).sum();

    let mut sink = JsonlSink::new(&output_path);
    let purged = if purge {
        sink.purge_sources(&purge_targets(&reports))?
    } else {
        0
    };

    if records == 0 {
        output::print_no_docs(&mut writer, pdfs, purge.then_some(purged), color)?;
        return Ok(());
    }

    for report in &reports {
        sink.write(&report.records)?;
    }
    sink.finish()?;

    let summary = IngestSummary {
        pdfs,
        documents: reports.len(),
        failed,
        records: sink.written(),
        purged: purge.then_some(purged),
        stats,
        output: output_path,
    };
    output::print_ingest_summary(&mut writer, &summary, color)?;

    Ok(())
}

fn inspect(
    file_path: PathBuf,
    min_page_chars: Option<usize>,
    no_color: bool,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let config = config_file::load_config();
    let ingest_config = IngestConfig {
        filter: build_filter(&config, min_page_chars)?,
        chunking: None,
        ..IngestConfig::default()
    };
    let backend = build_backend(&config);
    let report = ingest_document(&file_path, &backend, &ingest_config)?;

    let color = ColorMode(!no_color);
    let mut writer = std::io::stdout();
    output::print_inspect_report(&mut writer, &report, color)?;

    Ok(())
}

fn build_filter(config: &ConfigFile, min_page_chars: Option<usize>) -> anyhow::Result<PageFilter> {
    let section = config.filter.clone().unwrap_or_default();
    let mut builder = FilterConfigBuilder::from_section(&section);
    if let Some(n) = min_page_chars {
        builder = builder.min_page_chars(n);
    }
    let filter_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid [filter] configuration: {}", e))?;
    Ok(PageFilter::with_config(filter_config))
}

fn build_backend(config: &ConfigFile) -> MupdfBackend {
    let mut backend = MupdfBackend::new();
    if let Some(pdf) = &config.pdf {
        if let Some(ratio) = pdf.header_exclusion {
            backend = backend.with_header_exclusion(ratio);
        }
        if let Some(ratio) = pdf.footer_exclusion {
            backend = backend.with_footer_exclusion(ratio);
        }
    }
    backend
}

fn progress_bar(len: u64) -> anyhow::Result<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};

    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len} PDFs (eta {eta})",
    )?
    .progress_chars("=> ");

    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar.set_message("Extracting");
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

/// Sources whose records are replaced by this run: every document that was
/// extracted, including ones whose pages were all filtered out. Failed
/// extractions never reach `reports`, so their earlier records stay.
fn purge_targets(reports: &[DocumentReport]) -> Vec<String> {
    reports.iter().map(|r| r.source.clone()).collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %value, "ignoring unparseable environment variable");
    }
    parsed
}

/// Only a literal `true` (any case) enables a flag.
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use phishguard_core::config_file::FilterSection;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE\n"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("1"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_build_filter_cli_overrides_file() {
        let config = ConfigFile {
            filter: Some(FilterSection {
                min_page_chars: Some(300),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            build_filter(&config, None).unwrap().config().min_page_chars(),
            300
        );
        assert_eq!(
            build_filter(&config, Some(20))
                .unwrap()
                .config()
                .min_page_chars(),
            20
        );
    }

    #[test]
    fn test_build_filter_rejects_bad_ratio() {
        let config = ConfigFile {
            filter: Some(FilterSection {
                reference_line_ratio: Some(1.5),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(build_filter(&config, None).is_err());
    }

    fn prose(len: usize) -> String {
        "Never enter credentials on a page reached from an email link. "
            .chars()
            .cycle()
            .take(len)
            .collect()
    }

    fn extracted(name: &str, config: &IngestConfig) -> DocumentReport {
        let document = phishguard_core::SourceDocument::from_pages(
            std::path::Path::new(name),
            vec![prose(400), prose(300)],
        );
        phishguard_ingest::filter_document(&document, config)
    }

    #[test]
    fn test_purge_targets_include_fully_filtered_documents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("documents.jsonl");
        let pages = IngestConfig {
            chunking: None,
            ..IngestConfig::default()
        };

        let mut sink = JsonlSink::new(&out);
        for report in [extracted("a.pdf", &pages), extracted("b.pdf", &pages)] {
            sink.write(&report.records).unwrap();
        }
        sink.finish().unwrap();

        // A stricter gate now drops every page of a.pdf.
        let strict = IngestConfig {
            filter: PageFilter::with_config(
                FilterConfigBuilder::new()
                    .min_page_chars(10_000)
                    .build()
                    .unwrap(),
            ),
            ..pages
        };
        let rerun = vec![extracted("a.pdf", &strict)];
        assert!(rerun[0].records.is_empty());
        assert_eq!(purge_targets(&rerun), vec!["a.pdf".to_string()]);

        let mut sink = JsonlSink::new(&out);
        assert_eq!(sink.purge_sources(&purge_targets(&rerun)).unwrap(), 2);
        let remaining = std::fs::read_to_string(&out).unwrap();
        assert_eq!(remaining.lines().count(), 2);
        assert!(remaining.lines().all(|l| l.contains("\"b.pdf\"")));
    }

    #[test]
    fn test_env_parse_ignores_unparseable_values() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("PHISHGUARD_TEST_CHUNK_SIZE", "abc");
        }
        assert_eq!(env_parse::<usize>("PHISHGUARD_TEST_CHUNK_SIZE"), None);
        unsafe {
            std::env::set_var("PHISHGUARD_TEST_CHUNK_SIZE", " 400 ");
        }
        assert_eq!(env_parse::<usize>("PHISHGUARD_TEST_CHUNK_SIZE"), Some(400));
        assert_eq!(env_parse::<usize>("PHISHGUARD_TEST_UNSET_VAR"), None);
    }

    #[test]
    fn test_cli_parses_ingest_flags() {
        let cli = Cli::try_parse_from([
            "phishguard",
            "ingest",
            "corpus",
            "-o",
            "out.jsonl",
            "--no-chunk",
            "--workers",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.pdf_dir, Some(PathBuf::from("corpus")));
                assert_eq!(args.output, Some(PathBuf::from("out.jsonl")));
                assert!(args.no_chunk);
                assert_eq!(args.workers, Some(2));
                assert!(!args.no_purge);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
