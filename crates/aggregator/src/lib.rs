//! The aggregator of the sync committee: packs the blocks of the L2 shards into batches, commits
//! them to L1 and keeps the local progress in line with the state finalized on L1.

pub use aggregator::{Aggregator, AggregatorConfig, DEFAULT_POLL_INTERVAL};
mod aggregator;

pub use constraints::{
    BatchConstraintChecker, BatchConstraints, ConstraintCheckResult, DEFAULT_MAX_BLOCKS_COUNT,
    DEFAULT_SEAL_AFTER,
};
mod constraints;

pub use error::{AggregatorError, ResetError, SyncError, SyncFailure};
mod error;

mod metrics;

pub use reset::{ResetLauncher, Resetter};
mod reset;

pub use syncer::{
    StateRootSyncTask, StateRootSyncer, SyncAction, SyncOutcome, SyncerConfig,
    DEFAULT_SYNC_INTERVAL,
};
mod syncer;
