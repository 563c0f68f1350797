use sync_committee_primitives::BatchId;

/// The error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// The storage holds the maximum number of batches.
    #[error("storage capacity limit of {0} batches reached")]
    CapacityLimitReached(usize),
    /// The batch was not found in storage.
    #[error("batch {0} not found in storage")]
    BatchNotFound(BatchId),
    /// The written batch neither replaces nor follows the latest stored batch.
    #[error("batch {batch} neither replaces nor follows the latest batch {latest:?}")]
    LatestBatchMismatch {
        /// The id of the latest stored batch.
        latest: Option<BatchId>,
        /// The id of the written batch.
        batch: BatchId,
    },
    /// A new batch cannot be written while the latest batch is still open.
    #[error("latest batch {0} is not sealed")]
    LatestBatchNotSealed(BatchId),
    /// A sealed batch cannot be overwritten.
    #[error("batch {0} is sealed and cannot be overwritten")]
    BatchSealed(BatchId),
    /// A proof task already exists for the batch.
    #[error("proof task already exists for batch {0}")]
    ProofTaskExists(BatchId),
    /// The proof task was written along with another batch.
    #[error("proof task of batch {task} written along with batch {batch}")]
    ProofTaskMismatch {
        /// The batch of the proof task.
        task: BatchId,
        /// The written batch.
        batch: BatchId,
    },
}

impl DatabaseError {
    /// Returns true if the error signals the storage is full.
    pub const fn is_capacity_limit(&self) -> bool {
        matches!(self, Self::CapacityLimitReached(_))
    }

    /// Returns true if the error signals the batch chain held in storage diverged from the
    /// caller's view of it.
    pub const fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            Self::LatestBatchMismatch { .. } | Self::LatestBatchNotSealed(_) | Self::BatchSealed(_)
        )
    }
}
