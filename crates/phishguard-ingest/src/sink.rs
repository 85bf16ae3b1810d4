use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use phishguard_core::PageRecord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The indexing collaborator: receives filtered records for embedding.
pub trait IndexSink {
    /// Remove everything previously indexed from these sources. Returns the
    /// number of records removed.
    fn purge_sources(&mut self, sources: &[String]) -> Result<usize, SinkError>;

    fn write(&mut self, records: &[PageRecord]) -> Result<(), SinkError>;

    /// Flush buffered output.
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Appends records to a JSON Lines file, one object per line.
pub struct JsonlSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
}

impl JsonlSink {
    /// The file is created (or opened for append) on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written through this sink so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn open(&self) -> Result<BufWriter<File>, SinkError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(BufWriter::new(file))
    }
}

impl IndexSink for JsonlSink {
    /// Rewrites the file without lines whose `metadata.source` is listed.
    /// Lines that are not valid JSON are kept as-is.
    fn purge_sources(&mut self, sources: &[String]) -> Result<usize, SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        if !self.path.exists() || sources.is_empty() {
            return Ok(0);
        }

        let sources: HashSet<&str> = sources.iter().map(String::as_str).collect();
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let reader = BufReader::new(File::open(&self.path)?);
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        let mut deleted = 0;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            for line in reader.lines() {
                let line = line?;
                let source = serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|v| v["metadata"]["source"].as_str().map(str::to_string));
                if source.is_some_and(|s| sources.contains(s.as_str())) {
                    deleted += 1;
                    continue;
                }
                writeln!(out, "{line}")?;
            }
            out.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::info!(path = %self.path.display(), deleted, "purged indexed sources");
        Ok(deleted)
    }

    fn write(&mut self, records: &[PageRecord]) -> Result<(), SinkError> {
        if self.writer.is_none() {
            self.writer = Some(self.open()?);
        }
        if let Some(writer) = self.writer.as_mut() {
            for record in records {
                serde_json::to_writer(&mut *writer, record)?;
                writer.write_all(b"\n")?;
            }
        }
        self.written += records.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
