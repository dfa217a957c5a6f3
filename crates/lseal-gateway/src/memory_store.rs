//! In-memory log store.

use std::collections::HashMap;
use std::sync::RwLock;

use lseal_types::Lseq;
use tracing::debug;

use crate::error::GatewayError;
use crate::traits::{LogStore, RawItem, ReplicaEvents, StoredValue};

type Result<T> = std::result::Result<T, GatewayError>;

/// Single-replica log held in memory.
///
/// Useful for tests, demos, and as the working copy behind file-backed
/// stores. Lseqs it assigns itself are decimal counters starting at `"1"`;
/// [`MemoryLogStore::put_at`] accepts any externally chosen lseq.
pub struct MemoryLogStore {
    replica_id: u32,
    log: RwLock<MemoryLog>,
}

#[derive(Default)]
struct MemoryLog {
    /// Writes in log order.
    items: Vec<RawItem>,
    /// lseq → index into `items`.
    positions: HashMap<Lseq, usize>,
    /// key → index of its latest write.
    latest: HashMap<Vec<u8>, usize>,
    /// Highest numeric lseq seen so far.
    counter: u64,
}

impl MemoryLog {
    fn append(&mut self, lseq: Lseq, key: &[u8], value: &[u8]) -> Result<()> {
        if self.positions.contains_key(&lseq) {
            return Err(GatewayError::DuplicateLseq(lseq));
        }
        if let Ok(n) = lseq.as_str().parse::<u64>() {
            self.counter = self.counter.max(n);
        }
        let index = self.items.len();
        self.positions.insert(lseq.clone(), index);
        self.latest.insert(key.to_vec(), index);
        self.items.push(RawItem {
            lseq,
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    fn reindex(&mut self) {
        self.positions.clear();
        self.latest.clear();
        for (index, item) in self.items.iter().enumerate() {
            self.positions.insert(item.lseq.clone(), index);
            self.latest.insert(item.key.clone(), index);
        }
    }
}

impl MemoryLogStore {
    /// Create an empty log for `replica_id`.
    pub fn new(replica_id: u32) -> Self {
        Self {
            replica_id,
            log: RwLock::new(MemoryLog::default()),
        }
    }

    /// The replica this store serves.
    pub fn replica_id(&self) -> u32 {
        self.replica_id
    }

    /// Append a write at an externally chosen lseq.
    pub fn put_at(&self, lseq: impl Into<Lseq>, key: &[u8], value: &[u8]) -> Result<()> {
        let mut log = self.log.write().expect("lock poisoned");
        log.append(lseq.into(), key, value)
    }

    /// The lseq the next [`LogStore::put`] will assign.
    pub(crate) fn next_lseq(&self) -> Lseq {
        let log = self.log.read().expect("lock poisoned");
        Lseq::new((log.counter + 1).to_string())
    }

    /// Whether `lseq` is already taken.
    pub(crate) fn contains(&self, lseq: &Lseq) -> bool {
        self.log
            .read()
            .expect("lock poisoned")
            .positions
            .contains_key(lseq)
    }

    /// Rewrite the value of an existing write in place.
    ///
    /// This breaks the append-only contract on purpose: it is how tests and
    /// drills simulate history being altered behind the log's back.
    pub fn overwrite_in_place(&self, lseq: &Lseq, value: &[u8]) -> Result<()> {
        let mut log = self.log.write().expect("lock poisoned");
        let index = *log
            .positions
            .get(lseq)
            .ok_or_else(|| GatewayError::UnknownLseq(lseq.clone()))?;
        log.items[index].value = value.to_vec();
        debug!(%lseq, "overwrote log entry in place");
        Ok(())
    }

    /// Drop a write from the log, as if history had been cut behind the
    /// log's back. Same caveat as [`MemoryLogStore::overwrite_in_place`].
    pub fn remove_in_place(&self, lseq: &Lseq) -> Result<RawItem> {
        let mut log = self.log.write().expect("lock poisoned");
        let index = *log
            .positions
            .get(lseq)
            .ok_or_else(|| GatewayError::UnknownLseq(lseq.clone()))?;
        let item = log.items.remove(index);
        log.reindex();
        debug!(%lseq, "removed log entry in place");
        Ok(item)
    }

    /// Number of raw writes, metadata included.
    pub fn len(&self) -> usize {
        self.log.read().expect("lock poisoned").items.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every raw write, in log order.
    pub fn items(&self) -> Vec<RawItem> {
        self.log.read().expect("lock poisoned").items.clone()
    }
}

impl LogStore for MemoryLogStore {
    fn events(&self, replica_id: u32, after: Option<&Lseq>, limit: u32) -> Result<ReplicaEvents> {
        if replica_id != self.replica_id {
            return Err(GatewayError::WrongReplica {
                requested: replica_id,
                returned: self.replica_id,
            });
        }
        let log = self.log.read().expect("lock poisoned");
        let start = match after {
            Some(lseq) => {
                log.positions
                    .get(lseq)
                    .ok_or_else(|| GatewayError::UnknownLseq(lseq.clone()))?
                    + 1
            }
            None => 0,
        };
        let items = log
            .items
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ReplicaEvents {
            replica_id: self.replica_id,
            items,
        })
    }

    fn get_value(&self, replica_id: u32, key: &[u8]) -> Result<Option<StoredValue>> {
        if replica_id != self.replica_id {
            return Err(GatewayError::WrongReplica {
                requested: replica_id,
                returned: self.replica_id,
            });
        }
        let log = self.log.read().expect("lock poisoned");
        Ok(log.latest.get(key).map(|&index| {
            let item = &log.items[index];
            StoredValue {
                lseq: item.lseq.clone(),
                value: item.value.clone(),
            }
        }))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Lseq> {
        let mut log = self.log.write().expect("lock poisoned");
        let lseq = Lseq::new((log.counter + 1).to_string());
        log.append(lseq.clone(), key, value)?;
        Ok(lseq)
    }
}
