//! The sign and validate roles over the incremental hash chain.

use lseal_chain::HashCalculator;
use lseal_gateway::LogGateway;
use lseal_sign::SignatureModule;
use lseal_types::{Lseq, SignedRecord};
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;

type Result<T> = std::result::Result<T, OrchestratorError>;

/// Outcome of one [`Orchestrator::sign_new`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignReport {
    /// Number of entries signed in this batch.
    pub signed: usize,
    /// The new checkpoint position.
    pub last_lseq: Lseq,
}

/// Outcome of one [`Orchestrator::validate_from_lseq`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProgress {
    /// Number of entries whose checkpoints matched.
    pub validated: usize,
    /// The last entry compared.
    pub last_lseq: Lseq,
    /// Chain value to resume from, present only when the whole batch was
    /// signed. `None` means the signed prefix of the log ends here.
    pub resume_hash: Option<Vec<u8>>,
}

/// Outcome of a full walk with [`Orchestrator::validate_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Entries validated across all batches.
    pub validated: usize,
    /// The last validated entry, `None` when nothing was signed yet.
    pub last_lseq: Option<Lseq>,
}

/// Drives one replica through signing and validation.
///
/// The orchestrator holds no state of its own: where signing left off is
/// whatever checkpoint the gateway stores, and validation is driven by the
/// cursor and hash the caller passes back in.
pub struct Orchestrator<G, C> {
    pub(crate) gateway: G,
    pub(crate) calculator: C,
    pub(crate) signer: SignatureModule,
}

impl<G: LogGateway, C: HashCalculator> Orchestrator<G, C> {
    /// Assemble an orchestrator from its parts.
    pub fn new(gateway: G, calculator: C, signer: SignatureModule) -> Self {
        Self {
            gateway,
            calculator,
            signer,
        }
    }

    /// The gateway this orchestrator drives.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Sign the next batch of entries past the stored checkpoint.
    ///
    /// Returns [`OrchestratorError::NoNewEntities`] when the log has nothing
    /// past the checkpoint. Records are persisted before the checkpoint
    /// pointer moves, so a failure part way leaves the checkpoint where it
    /// was and the next call re-signs the same batch.
    pub fn sign_new(&self) -> Result<SignReport> {
        let checkpoint = self.gateway.get_last_validated()?;
        let (cursor, seed) = match &checkpoint {
            Some(record) => {
                let lseq = record.source_lseq().ok_or_else(|| {
                    OrchestratorError::DetachedCheckpoint(record.validation_key.clone())
                })?;
                (Some(lseq), Some(record.hash.as_slice()))
            }
            None => (None, None),
        };

        let entries = self.gateway.read_batch(cursor.as_ref())?;
        if entries.is_empty() {
            debug!(cursor = ?cursor, "nothing to sign");
            return Err(OrchestratorError::NoNewEntities);
        }

        let records = self.calculator.calculate_batch(&entries, seed);
        if records.len() != entries.len() {
            return Err(OrchestratorError::BatchLengthMismatch {
                expected: entries.len(),
                actual: records.len(),
            });
        }

        let mut signed = Vec::with_capacity(records.len());
        for (entry, record) in entries.iter().zip(records) {
            let signature = self.signer.sign(&record.hash).map_err(|source| {
                OrchestratorError::Signature {
                    lseq: entry.lseq.clone(),
                    source,
                }
            })?;
            signed.push(SignedRecord { record, signature });
        }
        self.gateway.put_batch(&signed)?;

        let last_lseq = entries[entries.len() - 1].lseq.clone();
        info!(count = signed.len(), last_lseq = %last_lseq, "signed batch");
        Ok(SignReport {
            signed: signed.len(),
            last_lseq,
        })
    }

    /// Validate the next batch of entries after `cursor`.
    ///
    /// `cursor` and `seed_hash` come from the previous call's
    /// [`ValidationProgress`]; both are `None` to start from the beginning
    /// of the log. Only the signed prefix of the batch is compared.
    pub fn validate_from_lseq(
        &self,
        cursor: Option<&Lseq>,
        seed_hash: Option<&[u8]>,
    ) -> Result<ValidationProgress> {
        self.validate_page(cursor, seed_hash, None)
            .map(|(progress, _)| progress)
    }

    /// One validation step. The flag reports whether `watch` was among the
    /// entries validated in this page.
    fn validate_page(
        &self,
        cursor: Option<&Lseq>,
        seed_hash: Option<&[u8]>,
        watch: Option<&Lseq>,
    ) -> Result<(ValidationProgress, bool)> {
        if cursor.is_some() != seed_hash.is_some() {
            return Err(OrchestratorError::BadInput(
                "cursor and seed hash must be given together".into(),
            ));
        }

        let entries = self.gateway.read_batch(cursor)?;
        if entries.is_empty() {
            return Err(OrchestratorError::NoNewEntities);
        }

        let computed = self.calculator.calculate_batch(&entries, seed_hash);
        if computed.len() != entries.len() {
            return Err(OrchestratorError::BatchLengthMismatch {
                expected: entries.len(),
                actual: computed.len(),
            });
        }

        let lseqs: Vec<Lseq> = entries.iter().map(|e| e.lseq.clone()).collect();
        let stored = self.gateway.read_batch_validated(&lseqs)?;
        if stored.len() > computed.len() {
            return Err(OrchestratorError::BatchLengthMismatch {
                expected: computed.len(),
                actual: stored.len(),
            });
        }
        if stored.is_empty() {
            debug!(cursor = ?cursor, "reached unsigned tail");
            return Err(OrchestratorError::NoNewEntities);
        }

        for ((lseq, stored), computed) in lseqs.iter().zip(&stored).zip(&computed) {
            if stored.record.hash != computed.hash {
                warn!(lseq = %lseq, "stored chain hash does not match log");
                return Err(OrchestratorError::ValidationFailed { lseq: lseq.clone() });
            }
            self.signer
                .verify(&stored.signature, &stored.record.hash)
                .map_err(|source| OrchestratorError::Signature {
                    lseq: lseq.clone(),
                    source,
                })?;
        }

        let validated = stored.len();
        let last_lseq = lseqs[validated - 1].clone();
        let resume_hash = (validated == computed.len())
            .then(|| computed[validated - 1].hash.clone());
        let seen = watch.is_some_and(|watch| lseqs[..validated].contains(watch));
        debug!(count = validated, last_lseq = %last_lseq, "validated batch");
        Ok((
            ValidationProgress {
                validated,
                last_lseq,
                resume_hash,
            },
            seen,
        ))
    }

    /// Walk the whole signed prefix of the log from the beginning.
    ///
    /// Stops at the end of the log or at the first partially signed batch,
    /// since signing is sequential and nothing after it can be signed. The
    /// walk must pass the entry the stored checkpoint names; otherwise signed
    /// entries were cut from the log and the walk fails with
    /// [`OrchestratorError::Truncated`].
    pub fn validate_all(&self) -> Result<ValidationSummary> {
        // Read before walking: signing only ever moves the checkpoint forward.
        let checkpoint = match self.gateway.get_last_validated()? {
            Some(record) => Some(record.source_lseq().ok_or_else(|| {
                OrchestratorError::DetachedCheckpoint(record.validation_key.clone())
            })?),
            None => None,
        };
        let mut reached = checkpoint.is_none();

        let mut summary = ValidationSummary {
            validated: 0,
            last_lseq: None,
        };
        let mut seed: Option<Vec<u8>> = None;

        loop {
            let step = self.validate_page(
                summary.last_lseq.as_ref(),
                seed.as_deref(),
                checkpoint.as_ref(),
            );
            let (progress, seen) = match step {
                Ok(step) => step,
                Err(OrchestratorError::NoNewEntities) => break,
                Err(e) => return Err(e),
            };
            reached |= seen;
            summary.validated += progress.validated;
            summary.last_lseq = Some(progress.last_lseq);
            match progress.resume_hash {
                Some(hash) => seed = Some(hash),
                None => break,
            }
        }

        if let Some(checkpoint) = checkpoint.filter(|_| !reached) {
            warn!(
                checkpoint = %checkpoint,
                last_lseq = ?summary.last_lseq,
                "walk ended before the signed checkpoint"
            );
            return Err(OrchestratorError::Truncated { checkpoint });
        }

        info!(
            count = summary.validated,
            last_lseq = ?summary.last_lseq,
            "validation complete"
        );
        Ok(summary)
    }
}
