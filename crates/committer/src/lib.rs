//! The committer of the sync committee: seals batches with the data proofs of their blobs and
//! commits them to the rollup contract.

pub use error::{CommitterError, KzgError};
mod error;

pub use kzg::{CKzgBackend, KzgBackend};
mod kzg;

pub use metrics::CommitterMetrics;
mod metrics;

pub use preparer::{CommitPreparer, PreparedCommitment};
mod preparer;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;

use std::time::{Instant, SystemTime};
use sync_committee_l1::RollupContract;
use sync_committee_primitives::BlockBatch;

/// The default maximum number of blobs carried by a commit transaction.
pub const DEFAULT_MAX_BLOBS_IN_TX: usize = 6;

/// The configuration of the [`Committer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitterConfig {
    /// The maximum number of blobs carried by a commit transaction.
    pub max_blobs_in_tx: usize,
}

impl Default for CommitterConfig {
    fn default() -> Self {
        Self { max_blobs_in_tx: DEFAULT_MAX_BLOBS_IN_TX }
    }
}

/// Seals batches and commits them to the rollup contract.
#[derive(Debug)]
pub struct Committer<L, K> {
    l1: L,
    preparer: CommitPreparer<K>,
    metrics: CommitterMetrics,
}

impl<L: RollupContract, K: KzgBackend> Committer<L, K> {
    /// Returns a new [`Committer`].
    pub fn new(l1: L, kzg: K, config: CommitterConfig) -> Self {
        Self {
            l1,
            preparer: CommitPreparer::new(config.max_blobs_in_tx, kzg),
            metrics: CommitterMetrics::default(),
        }
    }

    /// Returns the commit preparer.
    pub const fn preparer(&self) -> &CommitPreparer<K> {
        &self.preparer
    }

    /// Seals the batch and commits it to L1. Returns the sealed batch.
    ///
    /// A batch which is already sealed is returned as is, without any call to L1. The data
    /// proofs are verified by the rollup contract before the blobs are submitted.
    pub async fn commit(
        &self,
        batch: BlockBatch,
        now: SystemTime,
    ) -> Result<BlockBatch, CommitterError> {
        if batch.is_sealed() {
            tracing::debug!(
                target: "sync_committee::committer",
                batch_id = %batch.id(),
                "batch already sealed, skipping commit"
            );
            return Ok(batch);
        }
        if batch.is_empty() {
            return Err(CommitterError::EmptyBatch(batch.id()));
        }

        let start = Instant::now();
        let result = self.seal_and_submit(&batch, now).await;
        self.metrics.commit_duration.record(start.elapsed().as_secs_f64());

        match &result {
            Ok(sealed) => {
                let blobs = sealed.data_proofs().len();
                self.metrics.committed_batches.increment(1);
                self.metrics.committed_blobs.increment(blobs as u64);
                self.metrics.blobs_per_batch.record(blobs as f64);
                tracing::info!(
                    target: "sync_committee::committer",
                    batch_id = %sealed.id(),
                    blobs,
                    blocks = sealed.blocks_count(),
                    "committed batch"
                );
            }
            Err(err) => {
                self.metrics.failures.increment(1);
                tracing::warn!(
                    target: "sync_committee::committer",
                    batch_id = %batch.id(),
                    ?err,
                    "failed to commit batch"
                );
            }
        }
        result
    }

    async fn seal_and_submit(
        &self,
        batch: &BlockBatch,
        now: SystemTime,
    ) -> Result<BlockBatch, CommitterError> {
        let start = Instant::now();
        let prepared = self.preparer.prepare(batch)?;
        self.metrics.preparation_duration.record(start.elapsed().as_secs_f64());

        let sealed = batch.seal(prepared.data_proofs, now)?;
        self.l1.verify_data_proofs(&prepared.versioned_hashes, sealed.data_proofs()).await?;
        self.l1.commit_batch(sealed.id(), prepared.sidecar).await?;

        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{batch_with_blocks, MockKzg};
    use std::sync::Arc;
    use sync_committee_l1::{ContractError, NoopRollupContract};

    fn committer() -> (Arc<NoopRollupContract>, Committer<Arc<NoopRollupContract>, MockKzg>) {
        let l1 = Arc::new(NoopRollupContract::with_verifier(MockKzg));
        (l1.clone(), Committer::new(l1, MockKzg, CommitterConfig::default()))
    }

    #[tokio::test]
    async fn test_commit_seals_and_submits() -> eyre::Result<()> {
        // Given
        let (l1, committer) = committer();
        let batch = batch_with_blocks(4, 1_000);

        // When
        let sealed = committer.commit(batch.clone(), SystemTime::now()).await?;

        // Then
        assert!(sealed.is_sealed());
        assert_eq!(sealed.id(), batch.id());
        assert_eq!(sealed.blocks(), batch.blocks());
        assert_eq!(sealed.data_proofs().len(), 1);
        assert!(l1.is_batch_committed(batch.id()).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_commit_sealed_batch_is_noop() -> eyre::Result<()> {
        // Given
        let (l1, committer) = committer();
        let sealed = committer.commit(batch_with_blocks(2, 10), SystemTime::now()).await?;

        // When
        l1.fail_next_commit(ContractError::BatchAlreadyCommitted);
        let again = committer.commit(sealed.clone(), SystemTime::now()).await?;

        // Then
        assert_eq!(again, sealed);
        // the injected failure was not consumed.
        let other = committer.commit(batch_with_blocks(1, 10), SystemTime::now()).await;
        assert!(other.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_commit_empty_batch_fails_without_side_effects() -> eyre::Result<()> {
        let (l1, committer) = committer();
        let batch = BlockBatch::new(None, SystemTime::now());

        let err = committer.commit(batch.clone(), SystemTime::now()).await.unwrap_err();

        assert!(matches!(err, CommitterError::EmptyBatch(_)));
        assert!(!l1.is_batch_committed(batch.id()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_surfaces_contract_revert() -> eyre::Result<()> {
        // Given
        let (l1, committer) = committer();
        l1.fail_next_commit(ContractError::BatchAlreadyCommitted);

        // When
        let err = committer.commit(batch_with_blocks(2, 10), SystemTime::now()).await.unwrap_err();

        // Then
        let reason = err.as_l1().and_then(|e| e.contract_error());
        assert_eq!(reason, Some(ContractError::BatchAlreadyCommitted));

        Ok(())
    }

    #[tokio::test]
    async fn test_contract_checks_the_kzg_openings() -> eyre::Result<()> {
        // Given
        let l1 = Arc::new(NoopRollupContract::new());
        let committer = Committer::new(l1.clone(), CKzgBackend::new(), CommitterConfig::default());
        let mock = Committer::new(l1.clone(), MockKzg, CommitterConfig::default());

        // When
        let sealed = committer.commit(batch_with_blocks(3, 500), SystemTime::now()).await?;
        let err = mock.commit(batch_with_blocks(2, 10), SystemTime::now()).await.unwrap_err();

        // Then
        assert!(l1.is_batch_committed(sealed.id()).await?);
        let reason = err.as_l1().and_then(|e| e.contract_error());
        assert_eq!(reason, Some(ContractError::InvalidDataProofItem));

        Ok(())
    }
}
