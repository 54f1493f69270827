// Run History
//
// Records which join orderings have been executed for which query, so the
// exploration loop can skip them in later passes.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::explorer::PermutationId;

/// One ordering of a query recorded in history, normally a timed execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub query_id: String,
    pub permutation_id: PermutationId,
    pub elapsed: Duration,
    pub rows: usize,
    /// Whether the engine's own join reordering was active
    pub optimizer_enabled: bool,
    /// False for orderings marked as tried without being run; their
    /// `elapsed` and `rows` carry no measurement
    pub executed: bool,
}

impl RunRecord {
    /// Mark an ordering as tried without running it
    pub fn unexecuted(query_id: impl Into<String>, permutation_id: PermutationId, optimizer_enabled: bool) -> Self {
        RunRecord {
            query_id: query_id.into(),
            permutation_id,
            elapsed: Duration::ZERO,
            rows: 0,
            optimizer_enabled,
            executed: false,
        }
    }
}

/// Error type for history operations
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Store of previously executed orderings
pub trait HistoryStore {
    /// Identifiers already executed for a query
    fn tried(&self, query_id: &str) -> HashSet<PermutationId>;

    /// Append a record. Recording the same ordering twice is allowed.
    fn record(&mut self, record: RunRecord) -> HistoryResult<()>;

    /// Number of stored records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn tried_in(records: &[RunRecord], query_id: &str) -> HashSet<PermutationId> {
    records
        .iter()
        .filter(|r| r.query_id == query_id)
        .map(|r| r.permutation_id.clone())
        .collect()
}

/// History kept in memory only
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistory {
    records: Vec<RunRecord>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }
}

impl HistoryStore for InMemoryHistory {
    fn tried(&self, query_id: &str) -> HashSet<PermutationId> {
        tried_in(&self.records, query_id)
    }

    fn record(&mut self, record: RunRecord) -> HistoryResult<()> {
        self.records.push(record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// History persisted as a file of bincode-encoded records, appended on
/// every write
pub struct FileHistory {
    path: PathBuf,
    file: File,
    records: Vec<RunRecord>,
}

impl FileHistory {
    /// Open (or create) a history file and load the records it holds.
    ///
    /// A record cut short at the end of the file is dropped.
    pub fn open(path: impl AsRef<Path>) -> HistoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut records = Vec::new();
        let mut reader = BufReader::new(File::open(&path)?);
        while !reader.fill_buf()?.is_empty() {
            match bincode::deserialize_from::<_, RunRecord>(&mut reader) {
                Ok(record) => records.push(record),
                Err(err) => {
                    let truncated = matches!(
                        &*err,
                        bincode::ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof
                    );
                    if !truncated {
                        return Err(HistoryError::Encoding(err));
                    }
                    log::warn!("Ignoring truncated record at the end of {}", path.display());
                    break;
                }
            }
        }

        log::debug!("Loaded {} history records from {}", records.len(), path.display());
        Ok(FileHistory { path, file, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }
}

impl HistoryStore for FileHistory {
    fn tried(&self, query_id: &str) -> HashSet<PermutationId> {
        tried_in(&self.records, query_id)
    }

    fn record(&mut self, record: RunRecord) -> HistoryResult<()> {
        let bytes = bincode::serialize(&record)?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        self.records.push(record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// History shared between workers.
///
/// Lookups and appends are individually atomic; two workers may still pick
/// the same ordering before either records it.
pub struct SharedHistory<H: HistoryStore> {
    inner: Arc<RwLock<H>>,
}

impl<H: HistoryStore> SharedHistory<H> {
    pub fn new(store: H) -> Self {
        SharedHistory {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Run a closure against the underlying store
    pub fn with<T>(&self, f: impl FnOnce(&H) -> T) -> T {
        f(&self.inner.read())
    }
}

impl<H: HistoryStore> Clone for SharedHistory<H> {
    fn clone(&self) -> Self {
        SharedHistory {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: HistoryStore> HistoryStore for SharedHistory<H> {
    fn tried(&self, query_id: &str) -> HashSet<PermutationId> {
        self.inner.read().tried(query_id)
    }

    fn record(&mut self, record: RunRecord) -> HistoryResult<()> {
        self.inner.write().record(record)
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }
}
