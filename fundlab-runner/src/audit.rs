//! Cycle audit trail — JSONL append-only persistence.
//!
//! Every completed cycle is appended as one JSON object per line. Each
//! line is independent, so the format survives partial writes and can be
//! streamed. The latest record's portfolio snapshot doubles as the
//! bootstrap source for the next session.
//!
//! An audit failure never loses trading state: the orchestrator marks the
//! cycle degraded and carries on with its in-memory portfolio.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fundlab_core::cycle::CycleRecord;
use fundlab_core::domain::PortfolioSnapshot;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("audit record malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Destination for completed cycle records.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &CycleRecord) -> Result<(), AuditError>;

    /// The portfolio snapshot of the most recently appended record, if any.
    fn latest_snapshot(&self) -> Result<Option<PortfolioSnapshot>, AuditError>;
}

/// File-backed sink: one JSON object per line.
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, record: &CycleRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }

    fn latest_snapshot(&self) -> Result<Option<PortfolioSnapshot>, AuditError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut last = None;
        for line in io::BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last = Some(line);
            }
        }
        match last {
            Some(line) => {
                let record: CycleRecord = serde_json::from_str(&line)?;
                Ok(Some(record.snapshot))
            }
            None => Ok(None),
        }
    }
}

/// In-memory sink for tests. `fail_appends` makes every append error so
/// degraded-audit handling can be exercised.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<CycleRecord>>,
    fail_appends: bool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { records: Mutex::new(Vec::new()), fail_appends: true }
    }

    pub fn records(&self) -> Vec<CycleRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: &CycleRecord) -> Result<(), AuditError> {
        if self.fail_appends {
            return Err(AuditError::Io(io::Error::new(
                io::ErrorKind::Other,
                "sink configured to fail",
            )));
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }

    fn latest_snapshot(&self) -> Result<Option<PortfolioSnapshot>, AuditError> {
        Ok(self
            .records
            .lock()
            .ok()
            .and_then(|r| r.last().map(|rec| rec.snapshot.clone())))
    }
}
