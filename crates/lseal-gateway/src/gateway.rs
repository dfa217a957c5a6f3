//! [`LseqGateway`]: the production [`LogGateway`] over any [`LogStore`].

use lseal_types::{
    LAST_VALIDATED_KEY, LogEntry, Lseq, SNAPSHOT_KEY, SignedCheckpoint, SignedRecord,
    ValidationRecord, decode_validation_value, is_validation_key, make_validation_key,
};
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::traits::{LogGateway, LogStore, ReplicaEvents};

type Result<T> = std::result::Result<T, GatewayError>;

/// Default number of user entries per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Reads and writes one replica of a log store.
///
/// User entries and validation metadata share the store's keyspace; this
/// gateway hides the metadata from [`LogGateway::read_batch`] and stores each
/// signed record as `hex(hash);hex(signature)` under its validation key. The
/// `last_validated` pointer holds the lseq of the newest signed entry.
pub struct LseqGateway<S> {
    store: S,
    replica_id: u32,
    page_size: u32,
}

impl<S: LogStore> LseqGateway<S> {
    /// Gateway for `replica_id` with the default page size.
    pub fn new(store: S, replica_id: u32) -> Self {
        Self {
            store,
            replica_id,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The replica this gateway serves.
    pub fn replica_id(&self) -> u32 {
        self.replica_id
    }

    /// Number of user entries returned per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn events(&self, after: Option<&Lseq>) -> Result<ReplicaEvents> {
        let events = self.store.events(self.replica_id, after, self.page_size)?;
        if events.replica_id != self.replica_id {
            return Err(GatewayError::WrongReplica {
                requested: self.replica_id,
                returned: events.replica_id,
            });
        }
        Ok(events)
    }

    /// Read and decode the value stored under a validation-namespace key.
    fn read_signed(&self, key: &str) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(stored) = self.store.get_value(self.replica_id, key.as_bytes())? else {
            return Ok(None);
        };
        let value = std::str::from_utf8(&stored.value)
            .map_err(|_| GatewayError::NonUtf8Value(key.to_string()))?;
        let decoded = decode_validation_value(value).map_err(|source| GatewayError::Malformed {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(decoded))
    }
}

impl<S: LogStore> LogGateway for LseqGateway<S> {
    fn read_batch(&self, after: Option<&Lseq>) -> Result<Vec<LogEntry>> {
        let limit = self.page_size as usize;
        let mut cursor = after.cloned();
        let mut entries = Vec::new();

        // Raw pages may be mostly metadata, so keep going until the page of
        // user entries is full or the log runs out.
        'pages: loop {
            let events = self.events(cursor.as_ref())?;
            let exhausted = events.items.len() < limit;
            for item in events.items {
                cursor = Some(item.lseq.clone());
                if is_validation_key(&item.key) {
                    continue;
                }
                entries.push(LogEntry {
                    lseq: item.lseq,
                    key: item.key,
                    value: item.value,
                });
                if entries.len() == limit {
                    break 'pages;
                }
            }
            if exhausted {
                break;
            }
        }

        debug!(
            after = ?after,
            count = entries.len(),
            replica_id = self.replica_id,
            "read batch"
        );
        Ok(entries)
    }

    fn read_batch_validated(&self, lseqs: &[Lseq]) -> Result<Vec<SignedRecord>> {
        let mut records = Vec::with_capacity(lseqs.len());
        for lseq in lseqs {
            let key = make_validation_key(lseq);
            let Some((hash, signature)) = self.read_signed(&key)? else {
                break;
            };
            records.push(SignedRecord {
                record: ValidationRecord::from_key(key, hash),
                signature,
            });
        }
        debug!(
            requested = lseqs.len(),
            found = records.len(),
            "read stored validation records"
        );
        Ok(records)
    }

    fn get_last_validated(&self) -> Result<Option<ValidationRecord>> {
        let Some(pointer) = self
            .store
            .get_value(self.replica_id, LAST_VALIDATED_KEY.as_bytes())?
        else {
            return Ok(None);
        };
        let lseq = String::from_utf8(pointer.value)
            .map(Lseq::from)
            .map_err(|_| GatewayError::NonUtf8Value(LAST_VALIDATED_KEY.to_string()))?;

        let key = make_validation_key(&lseq);
        let (hash, _signature) = self
            .read_signed(&key)?
            .ok_or_else(|| GatewayError::LastValidatedMissing(lseq.clone()))?;
        Ok(Some(ValidationRecord::new(&lseq, hash, true)))
    }

    fn put_batch(&self, records: &[SignedRecord]) -> Result<()> {
        let Some(last) = records.last() else {
            return Ok(());
        };
        let last_lseq = last.record.source_lseq().ok_or_else(|| {
            GatewayError::Store(format!(
                "validation key {} is outside the validation namespace",
                last.record.validation_key
            ))
        })?;

        for signed in records {
            self.store.put(
                signed.record.validation_key.as_bytes(),
                signed.encode_value().as_bytes(),
            )?;
        }
        // The pointer goes last: a failure above leaves it where it was.
        self.store
            .put(LAST_VALIDATED_KEY.as_bytes(), last_lseq.as_str().as_bytes())?;

        info!(count = records.len(), last_lseq = %last_lseq, "stored validation records");
        Ok(())
    }

    fn put_snapshot(&self, checkpoint: &SignedCheckpoint) -> Result<()> {
        let lseq = self
            .store
            .put(SNAPSHOT_KEY.as_bytes(), checkpoint.encode_value().as_bytes())?;
        info!(lseq = %lseq, "stored snapshot attestation");
        Ok(())
    }

    fn get_snapshot(&self) -> Result<Option<SignedCheckpoint>> {
        Ok(self
            .read_signed(SNAPSHOT_KEY)?
            .map(|(digest, signature)| SignedCheckpoint { digest, signature }))
    }

    fn close(&self) -> Result<()> {
        self.store.close()
    }
}
