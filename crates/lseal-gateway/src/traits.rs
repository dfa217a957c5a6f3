//! The two seams of this crate: [`LogGateway`], what the orchestrator talks
//! to, and [`LogStore`], the raw log-structured store underneath it.

use std::sync::Arc;

use lseal_types::{LogEntry, Lseq, SignedCheckpoint, SignedRecord, ValidationRecord};

use crate::error::GatewayError;

type Result<T> = std::result::Result<T, GatewayError>;

/// Access to one replica's log, as the orchestrator needs it.
///
/// Implementations hide where user entries and validation metadata live and
/// how they are encoded. All calls are blocking round trips.
pub trait LogGateway {
    /// Up to one page of user entries strictly after `after` (from the start
    /// of the log when `None`), in log order. Entries in the validation
    /// namespace are never returned.
    fn read_batch(&self, after: Option<&Lseq>) -> Result<Vec<LogEntry>>;

    /// Stored, signed records for `lseqs`, in the same order.
    ///
    /// Returns a prefix: reading stops at the first lseq without a record.
    fn read_batch_validated(&self, lseqs: &[Lseq]) -> Result<Vec<SignedRecord>>;

    /// The most recent checkpoint, or `None` if signing never ran.
    fn get_last_validated(&self) -> Result<Option<ValidationRecord>>;

    /// Persist signed records, then advance the checkpoint pointer to the
    /// last of them. A failure part way leaves the pointer untouched.
    fn put_batch(&self, records: &[SignedRecord]) -> Result<()>;

    /// Persist a whole-replica attestation, replacing any earlier one.
    fn put_snapshot(&self, checkpoint: &SignedCheckpoint) -> Result<()>;

    /// The most recent whole-replica attestation.
    fn get_snapshot(&self) -> Result<Option<SignedCheckpoint>>;

    /// Release the underlying connection.
    fn close(&self) -> Result<()>;
}

impl<G: LogGateway + ?Sized> LogGateway for &G {
    fn read_batch(&self, after: Option<&Lseq>) -> Result<Vec<LogEntry>> {
        (**self).read_batch(after)
    }

    fn read_batch_validated(&self, lseqs: &[Lseq]) -> Result<Vec<SignedRecord>> {
        (**self).read_batch_validated(lseqs)
    }

    fn get_last_validated(&self) -> Result<Option<ValidationRecord>> {
        (**self).get_last_validated()
    }

    fn put_batch(&self, records: &[SignedRecord]) -> Result<()> {
        (**self).put_batch(records)
    }

    fn put_snapshot(&self, checkpoint: &SignedCheckpoint) -> Result<()> {
        (**self).put_snapshot(checkpoint)
    }

    fn get_snapshot(&self) -> Result<Option<SignedCheckpoint>> {
        (**self).get_snapshot()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// One raw write in a replica's log, user data or metadata alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Position assigned by the store.
    pub lseq: Lseq,
    /// Key as written.
    pub key: Vec<u8>,
    /// Value as written.
    pub value: Vec<u8>,
}

/// A page of raw events, tagged with the replica that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaEvents {
    /// Replica the events belong to.
    pub replica_id: u32,
    /// Events in log order.
    pub items: Vec<RawItem>,
}

/// The latest value written under a key, and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    /// Position of the write.
    pub lseq: Lseq,
    /// The value.
    pub value: Vec<u8>,
}

/// The raw surface of a log-structured key-value store.
///
/// Every write is appended at a new lseq; a key's current value is its most
/// recent write. All implementations must be `Send + Sync`.
pub trait LogStore: Send + Sync {
    /// At most `limit` raw events of `replica_id` strictly after `after`.
    fn events(&self, replica_id: u32, after: Option<&Lseq>, limit: u32) -> Result<ReplicaEvents>;

    /// Latest value of `key` on `replica_id`.
    fn get_value(&self, replica_id: u32, key: &[u8]) -> Result<Option<StoredValue>>;

    /// Append a write, returning its lseq.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<Lseq>;

    /// Flush and release resources.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: LogStore + ?Sized> LogStore for Arc<T> {
    fn events(&self, replica_id: u32, after: Option<&Lseq>, limit: u32) -> Result<ReplicaEvents> {
        (**self).events(replica_id, after, limit)
    }

    fn get_value(&self, replica_id: u32, key: &[u8]) -> Result<Option<StoredValue>> {
        (**self).get_value(replica_id, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Lseq> {
        (**self).put(key, value)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
