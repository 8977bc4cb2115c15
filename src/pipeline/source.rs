//! Raw reading sources.
//!
//! Fetching raw readings is the collaborator's job; the engine only consumes
//! what a [`ReadingSource`] yields. Sources do not canonicalize anything.
//! They hand over raw JSON values and report whether the stream has ended.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::warn;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Events produced by a reading source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Raw(Value),
    /// No more data
    Eof,
}

#[async_trait]
pub trait ReadingSource: Send {
    /// Next raw reading, or `Eof`. `Err` only for unrecoverable failures.
    async fn next_raw(&mut self) -> Result<SourceEvent, SourceError>;

    /// Human-readable name for logging
    fn source_name(&self) -> &str;

    /// Lines or records skipped because they were not valid JSON
    fn skipped(&self) -> usize {
        0
    }
}

/// Read everything a source has to offer
pub async fn collect_all(source: &mut dyn ReadingSource) -> Result<Vec<Value>, SourceError> {
    let mut out = Vec::new();
    while let SourceEvent::Raw(value) = source.next_raw().await? {
        out.push(value);
    }
    Ok(out)
}

// ============================================================================
// JSON lines (file / stdin / any async reader)
// ============================================================================

/// One JSON document per line. Blank lines are ignored; malformed lines
/// are logged, counted and skipped.
pub struct JsonLinesSource<R> {
    reader: BufReader<R>,
    line_buffer: String,
    line_no: usize,
    skipped: usize,
    name: String,
}

impl<R: AsyncRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_buffer: String::with_capacity(1024),
            line_no: 0,
            skipped: 0,
            name: name.into(),
        }
    }
}

impl JsonLinesSource<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), "stdin")
    }
}

impl JsonLinesSource<tokio::fs::File> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await.map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ReadingSource for JsonLinesSource<R> {
    async fn next_raw(&mut self) -> Result<SourceEvent, SourceError> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SourceEvent::Eof);
            }
            self.line_no += 1;

            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) => return Ok(SourceEvent::Raw(value)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(source = %self.name, line = self.line_no, error = %e, "Skipping malformed line");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

// ============================================================================
// Replay (pre-loaded values)
// ============================================================================

/// Yields pre-loaded raw readings, e.g. a batch pulled from storage
pub struct ReplaySource {
    values: std::vec::IntoIter<Value>,
}

impl ReplaySource {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }
}

#[async_trait]
impl ReadingSource for ReplaySource {
    async fn next_raw(&mut self) -> Result<SourceEvent, SourceError> {
        Ok(self.values.next().map_or(SourceEvent::Eof, SourceEvent::Raw))
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
