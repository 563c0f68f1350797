use crate::{batch::BatchId, ShardId};
use alloy_primitives::{BlockNumber, B256};

/// Errors raised while building chain segments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// A segment must contain at least one block.
    #[error("chain segment cannot be empty")]
    Empty,
    /// All the blocks of a segment must belong to the same shard.
    #[error("block of shard {got} in segment of shard {expected}")]
    ShardMismatch {
        /// The shard of the segment.
        expected: ShardId,
        /// The shard of the offending block.
        got: ShardId,
    },
    /// The block numbers are not strictly consecutive.
    #[error("non contiguous blocks in shard {shard_id}: expected number {expected}, got {got}")]
    NonContiguousBlocks {
        /// The shard of the segment.
        shard_id: ShardId,
        /// The expected block number.
        expected: BlockNumber,
        /// The block number found.
        got: BlockNumber,
    },
    /// The parent hash of a block does not match the hash of its predecessor.
    #[error("parent hash mismatch in shard {shard_id} at {number}: expected {expected}, got {got}")]
    ParentHashMismatch {
        /// The shard of the segment.
        shard_id: ShardId,
        /// The number of the offending block.
        number: BlockNumber,
        /// The hash of the predecessor.
        expected: B256,
        /// The parent hash of the offending block.
        got: B256,
    },
    /// The same shard appears twice in a collection of segments.
    #[error("duplicate segment for shard {0}")]
    DuplicateShard(ShardId),
}

/// Errors raised by [`BlockBatch`](crate::BlockBatch) transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// The batch was already sealed and can no longer change.
    #[error("batch {0} is already sealed")]
    AlreadySealed(BatchId),
    /// An empty batch cannot be sealed.
    #[error("batch {0} is empty")]
    EmptyBatch(BatchId),
    /// A batch must be sealed with at least one data proof.
    #[error("batch {0} cannot be sealed without data proofs")]
    MissingDataProofs(BatchId),
    /// The batch is not sealed.
    #[error("batch {0} is not sealed")]
    NotSealed(BatchId),
    /// The blocks could not be appended to the batch.
    #[error(transparent)]
    Segment(#[from] SegmentError),
}
