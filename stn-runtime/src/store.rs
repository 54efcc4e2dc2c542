//! Scan record persistence
//!
//! Records reach a store only through [`ScanStore::commit`], which takes a
//! whole [`StagedBatch`] and appends all of it or none of it.

use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use stn_core::ScanRecord;

/// Errors from a scan store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Records produced by one batch, waiting for a single commit
#[derive(Debug, Default)]
pub struct StagedBatch {
    records: Vec<ScanRecord>,
}

impl StagedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, record: ScanRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ScanRecord> {
        self.records
    }
}

/// Append-only store of scan records
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Atomically append every record in the batch; returns the count
    async fn commit(&self, batch: StagedBatch) -> Result<usize, StoreError>;

    /// All records for a domain, oldest first
    async fn history(&self, domain: &str) -> Result<Vec<ScanRecord>, StoreError>;

    /// Domains with at least one record
    async fn scanned_domains(&self) -> Result<BTreeSet<String>, StoreError>;

    /// The record with the greatest timestamp for a domain
    async fn latest(&self, domain: &str) -> Result<Option<ScanRecord>, StoreError> {
        Ok(self
            .history(domain)
            .await?
            .into_iter()
            .max_by_key(|record| record.timestamp()))
    }
}

/// Shared store handle
pub type SharedStore = Arc<dyn ScanStore>;

fn history_of(records: &[ScanRecord], domain: &str) -> Vec<ScanRecord> {
    let mut history: Vec<_> = records
        .iter()
        .filter(|record| record.domain() == domain)
        .cloned()
        .collect();
    history.sort_by_key(|record| record.timestamp());
    history
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ScanRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn commit(&self, batch: StagedBatch) -> Result<usize, StoreError> {
        let records = batch.into_records();
        let count = records.len();
        self.records.write().extend(records);
        Ok(count)
    }

    async fn history(&self, domain: &str) -> Result<Vec<ScanRecord>, StoreError> {
        Ok(history_of(&self.records.read(), domain))
    }

    async fn scanned_domains(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .map(|record| record.domain().to_string())
            .collect())
    }
}

/// Store backed by a JSON array on disk
///
/// Commits hold an exclusive advisory lock on `<path>.lock` for the whole
/// read-modify-write, so separate processes sharing one file serialize.
/// The new contents go to a uniquely named temporary sibling that is then
/// renamed over the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used for cross-process commit locking
    pub fn lock_path(&self) -> PathBuf {
        lock_path(&self.path)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn load(&self) -> Result<Vec<ScanRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => decode(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

fn decode(bytes: &[u8]) -> Result<Vec<ScanRecord>, StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Append records to the file at `path`; returns the new total
fn append_locked(path: &Path, records: Vec<ScanRecord>) -> Result<usize, StoreError> {
    let io_error = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path(path))
        .map_err(io_error)?;
    FileExt::lock_exclusive(&lock).map_err(io_error)?;

    let mut stored = match std::fs::read(path) {
        Ok(bytes) => decode(&bytes)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(io_error(e)),
    };
    stored.extend(records);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let bytes = serde_json::to_vec_pretty(&stored)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(&bytes).map_err(io_error)?;
    tmp.as_file().sync_all().map_err(io_error)?;
    tmp.persist(path).map_err(|e| io_error(e.error))?;

    // lock released when `lock` drops
    Ok(stored.len())
}

#[async_trait]
impl ScanStore for JsonFileStore {
    async fn commit(&self, batch: StagedBatch) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        let count = batch.len();
        let records = batch.into_records();
        let path = self.path.clone();

        let total = tokio::task::spawn_blocking(move || append_locked(&path, records))
            .await
            .map_err(|e| self.io_error(std::io::Error::other(e.to_string())))??;

        debug!("Wrote {} records to {}", total, self.path.display());
        info!("Committed {} scan records", count);
        Ok(count)
    }

    async fn history(&self, domain: &str) -> Result<Vec<ScanRecord>, StoreError> {
        Ok(history_of(&self.load().await?, domain))
    }

    async fn scanned_domains(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|record| record.domain().to_string())
            .collect())
    }
}
