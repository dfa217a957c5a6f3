//! Access to a replica's log and its validation namespace.
//!
//! This crate defines the [`LogGateway`] trait the orchestrator drives, the
//! production [`LseqGateway`] that implements it over a raw [`LogStore`], and
//! the store backends:
//!
//! - [`MemoryLogStore`]: in-memory log behind a `RwLock`.
//! - [`JsonlLogStore`]: append-only JSON-lines file replayed on open.
//! - [`FlakyStore`]: wrapper that injects failures for testing.

mod error;
mod flaky_store;
mod gateway;
mod jsonl_store;
mod memory_store;
mod traits;

#[cfg(test)]
mod tests;

pub use error::GatewayError;
pub use flaky_store::FlakyStore;
pub use gateway::{DEFAULT_PAGE_SIZE, LseqGateway};
pub use jsonl_store::JsonlLogStore;
pub use memory_store::MemoryLogStore;
pub use traits::{LogGateway, LogStore, RawItem, ReplicaEvents, StoredValue};
