use alloy_eips::BlockId as RpcBlockId;
use alloy_primitives::{BlockNumber, B256};
use sync_committee_primitives::{BlockId, SegmentError, ShardId};

/// An error returned by an [`L2Client`](crate::L2Client).
#[derive(Debug, thiserror::Error)]
pub enum L2ClientError {
    /// The block requested by number or tag does not exist.
    #[error("block {block} not found in shard {shard_id}")]
    BlockNotFound {
        /// The requested shard.
        shard_id: ShardId,
        /// The requested block.
        block: RpcBlockId,
    },
    /// The request could not be served.
    #[error(transparent)]
    Transport(#[from] alloy_transport::TransportError),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// An error occurring in the [`BlockFetcher`](crate::BlockFetcher).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The block does not exist.
    #[error("block {block} not found in shard {shard_id}")]
    BlockNotFound {
        /// The requested shard.
        shard_id: ShardId,
        /// The requested block.
        block: RpcBlockId,
    },
    /// A block referenced by a main shard block does not exist.
    #[error("child block {child} of main block {main_hash} not found")]
    ChildBlockNotFound {
        /// The referencing main shard block.
        main_hash: B256,
        /// The missing block.
        child: BlockId,
    },
    /// The client returned no block for a non-empty range.
    #[error("no block returned for range {from}..={to} of shard {shard_id}")]
    EmptyRange {
        /// The requested shard.
        shard_id: ShardId,
        /// The start of the range.
        from: BlockNumber,
        /// The end of the range.
        to: BlockNumber,
    },
    /// The client returned a block outside of the requested position.
    #[error("unexpected block {got} in shard {shard_id}, expected {expected}")]
    UnexpectedBlock {
        /// The requested shard.
        shard_id: ShardId,
        /// The expected block number.
        expected: BlockNumber,
        /// The returned block number.
        got: BlockNumber,
    },
    /// The blocks fetched to fill a gap do not lead to the referenced block.
    #[error("fetched chain of shard {shard_id} ends at {got}, expected {expected}")]
    SubgraphMismatch {
        /// The shard of the chain.
        shard_id: ShardId,
        /// The hash of the referenced block.
        expected: B256,
        /// The hash of the last fetched block.
        got: B256,
    },
    /// The fetched blocks do not form valid segments.
    #[error(transparent)]
    Segment(#[from] SegmentError),
    /// The client failed.
    #[error(transparent)]
    Client(L2ClientError),
}

impl From<L2ClientError> for FetchError {
    fn from(err: L2ClientError) -> Self {
        match err {
            L2ClientError::BlockNotFound { shard_id, block } => {
                Self::BlockNotFound { shard_id, block }
            }
            err => Self::Client(err),
        }
    }
}
