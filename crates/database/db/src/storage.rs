use crate::DatabaseError;
use alloy_primitives::B256;
use sync_committee_primitives::{BatchId, BlockBatch, BlockRefs, ProofTask};

/// The [`BatchStorage`] trait provides the operations on the persisted progress of the sync
/// committee: the chain of batches, the latest fetched block per shard, the proved state root and
/// the proof tasks.
///
/// Every write is atomic at the batch granularity: a failed call leaves the storage untouched.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc, &)]
pub trait BatchStorage: Send + Sync {
    /// Returns the most recent batch, sealed or not.
    async fn get_latest_batch(&self) -> Result<Option<BlockBatch>, DatabaseError>;

    /// Returns the batch with the provided id.
    async fn get_batch(&self, id: BatchId) -> Result<Option<BlockBatch>, DatabaseError>;

    /// Writes the batch.
    ///
    /// The write either replaces the latest batch, when the ids match, or appends a new batch
    /// whose parent is the latest sealed batch. Any other write fails with
    /// [`DatabaseError::LatestBatchMismatch`], which serializes concurrent writers on the latest
    /// batch. The latest fetched references are advanced to the latest blocks of the batch.
    async fn put_batch(&self, batch: &BlockBatch) -> Result<(), DatabaseError>;

    /// Writes the sealed batch along with its proof task, as a single write. Either both are
    /// stored or neither is. The batch is written as by [`BatchStorage::put_batch`].
    async fn put_sealed_batch(
        &self,
        batch: &BlockBatch,
        task: ProofTask,
    ) -> Result<(), DatabaseError>;

    /// Returns the reference to the latest fetched block of every shard.
    async fn get_latest_fetched(&self) -> Result<BlockRefs, DatabaseError>;

    /// Returns the latest proved state root, if initialized.
    async fn get_proved_state_root(&self) -> Result<Option<B256>, DatabaseError>;

    /// Sets the latest proved state root.
    async fn set_proved_state_root(&self, root: B256) -> Result<(), DatabaseError>;

    /// Marks the batch as proved and drops its proof task. Proved batches preceding it are
    /// evicted along with their proof tasks.
    async fn set_batch_proved(&self, id: BatchId) -> Result<(), DatabaseError>;

    /// Stores the proof task. A single task may exist per batch.
    async fn add_proof_task(&self, task: ProofTask) -> Result<(), DatabaseError>;

    /// Returns the proof task of the batch.
    async fn get_proof_task(&self, batch_id: BatchId) -> Result<Option<ProofTask>, DatabaseError>;

    /// Returns the proof tasks of the held batches, cancelled ones included.
    async fn get_proof_tasks(&self) -> Result<Vec<ProofTask>, DatabaseError>;

    /// Cancels the pending proof tasks of the provided batches. Returns the number of tasks
    /// cancelled.
    async fn cancel_proof_tasks(&self, batch_ids: &[BatchId]) -> Result<usize, DatabaseError>;

    /// Discards the batch and every batch following it, along with their proof tasks. The latest
    /// fetched references are rewound to their value before the batch was first written. Returns
    /// the ids of the discarded batches, oldest first.
    async fn reset_batches_partial(&self, id: BatchId) -> Result<Vec<BatchId>, DatabaseError>;

    /// Discards every batch which is not proved, along with their proof tasks, and clears the
    /// latest fetched references. Returns the ids of the discarded batches, oldest first.
    async fn reset_batches_not_proved(&self) -> Result<Vec<BatchId>, DatabaseError>;
}
