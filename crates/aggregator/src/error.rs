use alloy_primitives::{BlockNumber, B256};
use sync_committee_committer::CommitterError;
use sync_committee_db::DatabaseError;
use sync_committee_fetcher::FetchError;
use sync_committee_l1::{ContractError, L1Error};
use sync_committee_primitives::{BatchError, SegmentError};

/// The error type of the [`Aggregator`](crate::Aggregator).
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// The locally known progress does not match the main shard.
    #[error("main shard block {number} ({hash}) does not match the local progress")]
    BlockMismatch {
        /// The number of the expected block.
        number: BlockNumber,
        /// The hash of the expected block.
        hash: B256,
    },
    /// The block of the proved state root does not exist on the main shard.
    #[error("main shard block {0} of the proved state root not found")]
    ProvedBlockNotFound(B256),
    /// No proved state root is known, the syncer has not run yet.
    #[error("local state root not initialized")]
    LocalStateRootNotInitialized,
    /// The blocks of a single main shard block exceed the constraints of an empty batch.
    #[error("subgraph of main shard block {0} does not fit into a batch")]
    SubgraphTooLarge(BlockNumber),
    /// The blocks could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The storage rejected the operation.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The batch could not be committed.
    #[error(transparent)]
    Committer(#[from] CommitterError),
    /// The batch transition failed.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// A reset of the progress failed.
    #[error(transparent)]
    Reset(#[from] ResetError),
}

impl AggregatorError {
    /// Returns true if the local progress diverged from L2 or L1 and must be reset to the state
    /// finalized on L1.
    pub fn requires_l1_reset(&self) -> bool {
        match self {
            Self::BlockMismatch { .. } |
            Self::ProvedBlockNotFound(_) |
            Self::Fetch(FetchError::SubgraphMismatch { .. }) |
            Self::Batch(BatchError::Segment(SegmentError::ParentHashMismatch { .. })) => true,
            Self::Database(err) => err.is_consistency_error(),
            Self::Committer(CommitterError::L1(err)) => is_l1_divergence(err),
            _ => false,
        }
    }

    /// Returns true if the storage is full.
    pub fn is_capacity_limit(&self) -> bool {
        matches!(self, Self::Database(err) if err.is_capacity_limit())
    }

    /// Returns true if the local state root is not initialized.
    pub const fn is_not_initialized(&self) -> bool {
        matches!(self, Self::LocalStateRootNotInitialized)
    }
}

fn is_l1_divergence(err: &L1Error) -> bool {
    matches!(
        err.contract_error(),
        Some(
            ContractError::BatchAlreadyCommitted |
                ContractError::BatchAlreadyFinalized |
                ContractError::BatchNotCommitted |
                ContractError::OldStateRootMismatch
        )
    )
}

/// The cause of a failed state root synchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncFailure {
    /// The L2 shards could not be queried.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The rollup contract could not be queried.
    #[error(transparent)]
    L1(#[from] L1Error),
    /// The storage rejected the operation.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The local progress could not be reset.
    #[error(transparent)]
    Reset(Box<ResetError>),
}

impl From<ResetError> for SyncFailure {
    fn from(err: ResetError) -> Self {
        Self::Reset(Box::new(err))
    }
}

/// The error type of the [`StateRootSyncer`](crate::StateRootSyncer).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The local state root could not be synchronized with L1.
    #[error("state root not synced: {0}")]
    StateRootNotSynced(#[source] SyncFailure),
}

/// The error type of the [`Resetter`](crate::Resetter).
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// The storage rejected the reset.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The state root could not be synchronized after the reset.
    #[error(transparent)]
    Sync(#[from] SyncError),
}
