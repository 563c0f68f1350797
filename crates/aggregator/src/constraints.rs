use std::time::{Duration, SystemTime};
use sync_committee_codec::{encode_batch, BlobBuilder};
use sync_committee_committer::DEFAULT_MAX_BLOBS_IN_TX;
use sync_committee_primitives::BlockBatch;

/// The default maximum number of main shard blocks in a batch.
pub const DEFAULT_MAX_BLOCKS_COUNT: usize = 100;

/// The default age after which a non-empty batch is sealed.
pub const DEFAULT_SEAL_AFTER: Duration = Duration::from_secs(5 * 60);

/// The limits applied to an open batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConstraints {
    /// The maximum number of main shard blocks in a batch.
    pub max_blocks_count: usize,
    /// The age after which a non-empty batch is sealed.
    pub seal_after: Duration,
    /// The maximum number of blobs the encoded batch may span.
    pub max_blobs: usize,
}

impl Default for BatchConstraints {
    fn default() -> Self {
        Self {
            max_blocks_count: DEFAULT_MAX_BLOCKS_COUNT,
            seal_after: DEFAULT_SEAL_AFTER,
            max_blobs: DEFAULT_MAX_BLOBS_IN_TX,
        }
    }
}

/// The outcome of checking a batch against the [`BatchConstraints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintCheckResult {
    /// The batch satisfies every constraint and can receive more blocks.
    CanBeExtended,
    /// The batch reached a limit and must be sealed.
    ShouldBeSealed,
    /// The batch exceeds a limit. Its content must be rolled back.
    ShouldBeDiscarded,
}

/// Checks batches against the [`BatchConstraints`].
#[derive(Debug, Clone)]
pub struct BatchConstraintChecker {
    constraints: BatchConstraints,
    capacity: usize,
}

impl BatchConstraintChecker {
    /// Returns a new [`BatchConstraintChecker`].
    pub const fn new(constraints: BatchConstraints) -> Self {
        let capacity = BlobBuilder::new(constraints.max_blobs).capacity_bytes();
        Self { constraints, capacity }
    }

    /// Returns the checked constraints.
    pub const fn constraints(&self) -> &BatchConstraints {
        &self.constraints
    }

    /// Checks the batch at the provided time.
    ///
    /// Exceeding the block count or the blob capacity discards the batch. Reaching the block
    /// count exactly, or holding blocks for longer than the sealing age, seals it.
    pub fn check(&self, batch: &BlockBatch, now: SystemTime) -> ConstraintCheckResult {
        let main_blocks = batch.main_blocks_count();
        if main_blocks > self.constraints.max_blocks_count {
            return ConstraintCheckResult::ShouldBeDiscarded;
        }

        let encoded = encode_batch(batch).len();
        if encoded > self.capacity {
            tracing::debug!(
                target: "sync_committee::aggregator",
                batch_id = %batch.id(),
                encoded,
                capacity = self.capacity,
                "batch exceeds blob capacity"
            );
            return ConstraintCheckResult::ShouldBeDiscarded;
        }

        if main_blocks == self.constraints.max_blocks_count {
            return ConstraintCheckResult::ShouldBeSealed;
        }
        if !batch.is_empty() && batch.age(now) >= self.constraints.seal_after {
            return ConstraintCheckResult::ShouldBeSealed;
        }

        ConstraintCheckResult::CanBeExtended
    }
}
