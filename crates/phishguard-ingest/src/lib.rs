use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use phishguard_core::{BackendError, PageMetadata, PageRecord, PdfBackend, SourceDocument};
use phishguard_filter::{DocumentState, FilterStats, PageFilter, PageVerdict};

pub mod chunk;
pub mod discover;
pub mod sink;

pub use chunk::{ChunkConfig, chunk_text};
pub use discover::{discover_pdfs, is_pdf_path};
pub use sink::{IndexSink, JsonlSink, SinkError};
// Re-export domain types for convenience
pub use phishguard_core::DEFAULT_DOC_TYPE;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("PDF directory does not exist: {}", .0.display())]
    MissingDir(PathBuf),
    #[error("PDF extraction error: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker failed: {0}")]
    Worker(String),
    #[error("cancelled")]
    Cancelled,
}

/// Everything needed to turn one PDF into index records.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub filter: PageFilter,
    pub doc_type: String,
    /// `None` keeps one record per retained page.
    pub chunking: Option<ChunkConfig>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            filter: PageFilter::default(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            chunking: Some(ChunkConfig::default()),
        }
    }
}

/// Outcome of ingesting one PDF.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub source: String,
    pub filename: String,
    pub records: Vec<PageRecord>,
    pub decisions: Vec<PageVerdict>,
    pub stats: FilterStats,
    pub state: DocumentState,
}

/// Extract, filter and (optionally) chunk a single PDF.
pub fn ingest_document(
    path: &Path,
    backend: &dyn PdfBackend,
    config: &IngestConfig,
) -> Result<DocumentReport, IngestError> {
    let texts = backend.extract_pages(path)?;
    let document = SourceDocument::from_pages(path, texts);
    Ok(filter_document(&document, config))
}

/// Run the filter over an already-extracted document and build its records.
pub fn filter_document(document: &SourceDocument, config: &IngestConfig) -> DocumentReport {
    let outcome = config.filter.filter_pages(&document.pages);
    let stats = outcome.stats();

    for verdict in &outcome.decisions {
        tracing::debug!(
            file = %document.filename,
            page = verdict.index,
            decision = verdict.decision.label(),
            "page filtered"
        );
    }
    tracing::info!(
        file = %document.filename,
        pages = stats.pages,
        retained = stats.retained,
        closed_at = ?outcome.closed_at(),
        "filtered document"
    );

    let mut records = Vec::with_capacity(outcome.retained.len());
    for page in outcome.retained {
        let metadata = PageMetadata {
            source: document.source.clone(),
            filename: document.filename.clone(),
            page: page.index,
            doc_type: config.doc_type.clone(),
            chunk: None,
        };
        match &config.chunking {
            None => records.push(PageRecord {
                text: page.text,
                metadata,
            }),
            Some(chunking) => {
                records.extend(chunk_text(&page.text, chunking).into_iter().enumerate().map(
                    |(i, text)| PageRecord {
                        text,
                        metadata: PageMetadata {
                            chunk: Some(i),
                            ..metadata.clone()
                        },
                    },
                ));
            }
        }
    }

    DocumentReport {
        source: document.source.clone(),
        filename: document.filename.clone(),
        records,
        decisions: outcome.decisions,
        stats,
        state: outcome.state,
    }
}

/// Ingest many PDFs with at most `workers` extractions in flight.
///
/// Documents are independent, so each runs on the blocking pool. Results are
/// yielded in input order. A failing document yields its error without
/// stopping the others; once `cancel` fires, documents not yet started yield
/// [`IngestError::Cancelled`].
pub fn ingest_stream(
    paths: Vec<PathBuf>,
    backend: Arc<dyn PdfBackend>,
    config: Arc<IngestConfig>,
    workers: usize,
    cancel: CancellationToken,
) -> impl Stream<Item = (PathBuf, Result<DocumentReport, IngestError>)> {
    stream::iter(paths)
        .map(move |path| {
            let backend = Arc::clone(&backend);
            let config = Arc::clone(&config);
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (path, Err(IngestError::Cancelled));
                }
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || {
                    ingest_document(&task_path, backend.as_ref(), &config)
                })
                .await
                .unwrap_or_else(|e| Err(IngestError::Worker(e.to_string())));

                if let Err(e) = &result {
                    tracing::warn!(path = %path.display(), error = %e, "document skipped");
                }
                (path, result)
            }
        })
        .buffered(workers.max(1))
}

/// Collecting version of [`ingest_stream`].
pub async fn ingest_all(
    paths: Vec<PathBuf>,
    backend: Arc<dyn PdfBackend>,
    config: Arc<IngestConfig>,
    workers: usize,
    cancel: CancellationToken,
) -> Vec<(PathBuf, Result<DocumentReport, IngestError>)> {
    ingest_stream(paths, backend, config, workers, cancel)
        .collect()
        .await
}
