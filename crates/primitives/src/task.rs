use crate::{error::BatchError, BatchId, BlockBatch, BlockId};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// The identifier of a [`ProofTask`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Returns a new random [`TaskId`].
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

/// The status of a [`ProofTask`], as tracked by the sync committee. The progress of the proof
/// itself is owned by the prover pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofTaskStatus {
    /// The task is waiting to be picked up or is being executed.
    Pending,
    /// The batch of the task was discarded.
    Cancelled,
}

/// A request to prove a sealed batch, handed over to the proof pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofTask {
    /// The id of the task.
    pub id: TaskId,
    /// The batch to prove.
    pub batch_id: BatchId,
    /// The ordered ids of the blocks of the batch.
    pub block_ids: Vec<BlockId>,
    /// The status of the task.
    pub status: ProofTaskStatus,
    /// The creation time of the task.
    pub created_at: SystemTime,
}

impl ProofTask {
    /// Returns a new pending task for the provided batch. The batch must be sealed.
    pub fn for_batch(batch: &BlockBatch, now: SystemTime) -> Result<Self, BatchError> {
        if !batch.is_sealed() {
            return Err(BatchError::NotSealed(batch.id()));
        }
        Ok(Self {
            id: TaskId::new(),
            batch_id: batch.id(),
            block_ids: batch.block_ids(),
            status: ProofTaskStatus::Pending,
            created_at: now,
        })
    }

    /// Returns true if the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == ProofTaskStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_requires_sealed_batch() {
        let batch = BlockBatch::new(None, SystemTime::now());

        assert_eq!(
            ProofTask::for_batch(&batch, SystemTime::now()).unwrap_err(),
            BatchError::NotSealed(batch.id())
        );
    }
}
