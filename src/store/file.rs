//! File-backed store
//!
//! A MemoryStore that persists itself as a checksummed snapshot file.
//!
//! ## Snapshot Format
//! ```text
//! ┌────────────┬─────────────┬────────────┬──────────────────┬───────────┐
//! │ Magic (4)  │ Version (2) │ Length (8) │ Payload (bincode)│ CRC32 (4) │
//! └────────────┴─────────────┴────────────┴──────────────────┴───────────┘
//! ```
//! The CRC covers the payload. Snapshots are written to a temporary file
//! and renamed over the old one, so a crash mid-write leaves the previous
//! snapshot intact.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::{Config, SyncStrategy};
use crate::error::{OrmError, Result};
use crate::query::Direction;

use super::{KeyValueStore, MemoryStore, SortScore, StoredValue};

/// Magic bytes identifying a snapshot file
pub const MAGIC: &[u8; 4] = b"AORM";

/// Snapshot format version
pub const VERSION: u16 = 1;

/// Header size: magic + version + payload length
const HEADER_SIZE: usize = 4 + 2 + 8;

/// Store that keeps its records in memory and snapshots them to disk
pub struct FileStore {
    /// Snapshot location
    path: PathBuf,

    /// Live records
    inner: MemoryStore,

    sync_strategy: SyncStrategy,

    /// Mutations since the last snapshot (atomic, lock-free)
    pending_writes: AtomicUsize,

    /// Serialises snapshot writers
    flush_lock: Mutex<()>,
}

impl FileStore {
    /// Open the snapshot named by the config, or start empty
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::open_path(&config.data_file, config.sync_strategy)
    }

    /// Open a snapshot at an explicit path
    pub fn open_path(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = if path.exists() {
            read_snapshot(path)?
        } else {
            BTreeMap::new()
        };

        tracing::info!(
            path = %path.display(),
            keys = data.len(),
            "Opened file store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: MemoryStore::from_snapshot(data),
            sync_strategy,
            pending_writes: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory view of the records
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Mutations not yet in the snapshot
    pub fn pending_writes(&self) -> usize {
        self.pending_writes.load(Ordering::SeqCst)
    }

    /// Write a snapshot now
    pub fn flush(&self) -> Result<()> {
        let _guard = self.flush_lock.lock();
        let pending = self.pending_writes.swap(0, Ordering::SeqCst);

        if let Err(e) = write_snapshot(&self.path, &self.inner.snapshot()) {
            self.pending_writes.fetch_add(pending, Ordering::SeqCst);
            return Err(e);
        }

        tracing::debug!(path = %self.path.display(), pending, "Flushed snapshot");
        Ok(())
    }

    /// Count a mutation and snapshot if the strategy asks for it
    fn record_write(&self) -> Result<()> {
        let pending = self.pending_writes.fetch_add(1, Ordering::SeqCst) + 1;

        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.flush(),
            SyncStrategy::EveryNWrites { count } if pending >= count => self.flush(),
            SyncStrategy::EveryNWrites { .. } | SyncStrategy::Manual => Ok(()),
        }
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.pending_writes() == 0 {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to flush snapshot on drop"
            );
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.inner.set(key, value)?;
        self.record_write()
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)?;
        self.record_write()
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.inner.set_members(key)
    }

    fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.inner.set_add(key, member)?;
        self.record_write()
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.inner.set_remove(key, member)?;
        self.record_write()
    }

    fn sorted_set_upsert(&self, key: &str, member: &str, score: SortScore) -> Result<()> {
        self.inner.sorted_set_upsert(key, member, score)?;
        self.record_write()
    }

    fn sorted_set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.inner.sorted_set_remove(key, member)?;
        self.record_write()
    }

    fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<SortScore>> {
        self.inner.sorted_set_score(key, member)
    }

    fn sorted_set_range(
        &self,
        key: &str,
        start: i64,
        end: i64,
        direction: Direction,
    ) -> Result<Vec<String>> {
        self.inner.sorted_set_range(key, start, end, direction)
    }

    fn sorted_set_len(&self, key: &str) -> Result<usize> {
        self.inner.sorted_set_len(key)
    }
}

// =============================================================================
// Snapshot I/O
// =============================================================================

fn write_snapshot(path: &Path, data: &BTreeMap<String, StoredValue>) -> Result<()> {
    let payload = bincode::serialize(data)?;
    let crc = crc32fast::hash(&payload);

    let tmp_path = path.with_extension("tmp");
    {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.write_all(&crc.to_le_bytes())?;

        let file = writer
            .into_inner()
            .map_err(|e| OrmError::Io(e.into_error()))?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<BTreeMap<String, StoredValue>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    let corrupt = |reason: &str| {
        OrmError::Store(format!(
            "Snapshot {} is corrupt: {}",
            path.display(),
            reason
        ))
    };

    if bytes.len() < HEADER_SIZE + 4 {
        return Err(corrupt("file too short"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(corrupt(&format!("unsupported version {}", version)));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[6..HEADER_SIZE]);
    let len = usize::try_from(u64::from_le_bytes(len_bytes))
        .map_err(|_| corrupt("length does not match header"))?;

    let expected = HEADER_SIZE.checked_add(len).and_then(|n| n.checked_add(4));
    if expected != Some(bytes.len()) {
        return Err(corrupt("length does not match header"));
    }

    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + len];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[HEADER_SIZE + len..]);

    if crc32fast::hash(payload) != u32::from_le_bytes(crc_bytes) {
        return Err(corrupt("checksum mismatch"));
    }

    Ok(bincode::deserialize(payload)?)
}
