//! A [`LogStore`] wrapper that fails writes on demand.
//!
//! `FlakyStore` wraps any `Arc<dyn LogStore>` and turns selected calls into
//! [`GatewayError::Store`] errors, so callers can be exercised against a
//! backend that dies part way through a batch.
//!
//! # Example
//!
//! ```ignore
//! let flaky = FlakyStore::new(inner)
//!     .fail_puts_after(3)   // the 4th and later puts fail
//!     .fail_reads(false);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use lseal_types::Lseq;
use tracing::warn;

use crate::error::GatewayError;
use crate::traits::{LogStore, ReplicaEvents, StoredValue};

type Result<T> = std::result::Result<T, GatewayError>;

/// A [`LogStore`] wrapper that injects write and read failures.
pub struct FlakyStore {
    inner: Arc<dyn LogStore>,
    puts_allowed: AtomicU64,
    puts_seen: AtomicU64,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    /// Wrap an existing store; pass-through until configured otherwise.
    pub fn new(inner: Arc<dyn LogStore>) -> Self {
        Self {
            inner,
            puts_allowed: AtomicU64::new(u64::MAX),
            puts_seen: AtomicU64::new(0),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Let `n` more puts through, then fail every later one.
    pub fn fail_puts_after(self, n: u64) -> Self {
        self.set_puts_allowed(n);
        self
    }

    /// Fail every read while `fail` is set.
    pub fn fail_reads(self, fail: bool) -> Self {
        self.set_fail_reads(fail);
        self
    }

    /// Runtime form of [`FlakyStore::fail_puts_after`].
    pub fn set_puts_allowed(&self, n: u64) {
        let seen = self.puts_seen.load(Ordering::SeqCst);
        self.puts_allowed
            .store(seen.saturating_add(n), Ordering::SeqCst);
    }

    /// Runtime form of [`FlakyStore::fail_reads`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Let every later put through.
    pub fn heal(&self) {
        self.puts_allowed.store(u64::MAX, Ordering::SeqCst);
        self.fail_reads.store(false, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            warn!("injected read failure");
            return Err(GatewayError::Store("injected read failure".into()));
        }
        Ok(())
    }
}

impl LogStore for FlakyStore {
    fn events(&self, replica_id: u32, after: Option<&Lseq>, limit: u32) -> Result<ReplicaEvents> {
        self.check_read()?;
        self.inner.events(replica_id, after, limit)
    }

    fn get_value(&self, replica_id: u32, key: &[u8]) -> Result<Option<StoredValue>> {
        self.check_read()?;
        self.inner.get_value(replica_id, key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<Lseq> {
        let seen = self.puts_seen.fetch_add(1, Ordering::SeqCst);
        if seen >= self.puts_allowed.load(Ordering::SeqCst) {
            warn!(put = seen + 1, "injected write failure");
            return Err(GatewayError::Store("injected write failure".into()));
        }
        self.inner.put(key, value)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}
