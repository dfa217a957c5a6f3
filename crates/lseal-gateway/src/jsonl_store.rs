//! File-backed log store: one JSON object per line, append-only.
//!
//! Each line is `{"lseq": "...", "key": "<hex>", "value": "<hex>"}`. The file
//! is replayed into a [`MemoryLogStore`] on open. Every write is appended and
//! flushed before it reaches the in-memory copy, so a failed append leaves
//! both unchanged.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lseal_types::Lseq;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::memory_store::MemoryLogStore;
use crate::traits::{LogStore, ReplicaEvents, StoredValue};

type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Serialize, Deserialize)]
struct Line {
    lseq: Lseq,
    #[serde(with = "hex::serde")]
    key: Vec<u8>,
    #[serde(with = "hex::serde")]
    value: Vec<u8>,
}

/// A single replica persisted as a JSON-lines file.
pub struct JsonlLogStore {
    path: PathBuf,
    log: MemoryLogStore,
    file: Mutex<File>,
}

impl JsonlLogStore {
    /// Open (or create) the log at `path` for `replica_id`.
    pub fn open(path: impl AsRef<Path>, replica_id: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let log = MemoryLogStore::new(replica_id);
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (i, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let item: Line = serde_json::from_str(&line).map_err(|e| {
                    GatewayError::Serialization(format!("invalid line {}: {e}", i + 1))
                })?;
                log.put_at(item.lseq, &item.key, &item.value)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), replica_id, entries = log.len(), "opened log file");
        Ok(Self {
            path,
            log,
            file: Mutex::new(file),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines, metadata included.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether the log holds no writes.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Append a write at an externally chosen lseq.
    pub fn put_at(&self, lseq: impl Into<Lseq>, key: &[u8], value: &[u8]) -> Result<()> {
        let lseq = lseq.into();
        let mut file = self.file.lock().expect("lock poisoned");
        if self.log.contains(&lseq) {
            return Err(GatewayError::DuplicateLseq(lseq));
        }
        append_line(&mut file, lseq.clone(), key, value)?;
        self.log.put_at(lseq, key, value)
    }
}

fn append_line(file: &mut File, lseq: Lseq, key: &[u8], value: &[u8]) -> Result<()> {
    let line = serde_json::to_string(&Line {
        lseq,
        key: key.to_vec(),
        value: value.to_vec(),
    })?;
    writeln!(file, "{line}")?;
    file.flush()?;
    Ok(())
}

impl LogStore for JsonlLogStore {
    fn events(&self, replica_id: u32, after: Option<&Lseq>, limit: u32) -> Result<ReplicaEvents> {
        self.log.events(replica_id, after, limit)
    }

    fn get_value(&self, replica_id: u32, key: &[u8]) -> Result<Option<StoredValue>> {
        self.log.get_value(replica_id, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Lseq> {
        // Every write goes through the file lock, so the lseq picked here is
        // still free when the memory copy takes it.
        let mut file = self.file.lock().expect("lock poisoned");
        let lseq = self.log.next_lseq();
        append_line(&mut file, lseq.clone(), key, value)?;
        self.log.put_at(lseq.clone(), key, value)?;
        debug!(%lseq, "appended log line");
        Ok(lseq)
    }

    fn close(&self) -> Result<()> {
        let file = self.file.lock().expect("lock poisoned");
        file.sync_all()?;
        Ok(())
    }
}
