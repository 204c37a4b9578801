//! Processing history: an append-only ledger of processed uploads.
//!
//! Callers receive a store through the [`HistoryStore`] trait; the report
//! core never touches it.

use crate::error::{Error, Result};
use crate::processor::IndicatorMeans;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
}

/// A history entry before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub original_filename: String,
    pub processed_filename: Option<String>,
    pub processed_at: String,
    pub rows: Option<usize>,
    pub columns: Option<usize>,
    pub stats: Option<IndicatorMeans>,
    pub status: Status,
    pub error: Option<String>,
}

impl NewEntry {
    pub fn failed(original_filename: &str, processed_at: &str, error: &str) -> Self {
        Self {
            original_filename: original_filename.to_string(),
            processed_filename: None,
            processed_at: processed_at.to_string(),
            rows: None,
            columns: None,
            stats: None,
            status: Status::Failed,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    #[serde(flatten)]
    pub entry: NewEntry,
}

pub trait HistoryStore {
    /// Store `entry` and return it with its assigned id (1, 2, 3, ...).
    fn append(&self, entry: NewEntry) -> Result<HistoryRecord>;
    /// All records, most recent first.
    fn list_recent(&self) -> Result<Vec<HistoryRecord>>;
}

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&self, entry: NewEntry) -> Result<HistoryRecord> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::History("history lock poisoned".to_string()))?;
        let record = HistoryRecord { id: records.len() as u64 + 1, entry };
        records.push(record.clone());
        Ok(record)
    }

    fn list_recent(&self) -> Result<Vec<HistoryRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::History("history lock poisoned".to_string()))?;
        Ok(records.iter().rev().cloned().collect())
    }
}

/// File-backed store, one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn read_all(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                Error::History(format!("{} line {}: {}", self.path.display(), n + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl HistoryStore for JsonLinesHistory {
    fn append(&self, entry: NewEntry) -> Result<HistoryRecord> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::History("history lock poisoned".to_string()))?;
        let next_id = self.read_all()?.last().map(|r| r.id + 1).unwrap_or(1);
        let record = HistoryRecord { id: next_id, entry };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
        Ok(record)
    }

    fn list_recent(&self) -> Result<Vec<HistoryRecord>> {
        let mut records = self.read_all()?;
        records.reverse();
        Ok(records)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_processed: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub success_rate: String,
}

impl HistoryStats {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let success_count = records.iter().filter(|r| r.entry.status == Status::Success).count();
        let failed_count = records.iter().filter(|r| r.entry.status == Status::Failed).count();
        let success_rate = if records.is_empty() {
            "0%".to_string()
        } else {
            format!("{:.2}%", success_count as f64 / records.len() as f64 * 100.0)
        };
        Self { total_processed: records.len(), success_count, failed_count, success_rate }
    }
}
