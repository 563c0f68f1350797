//! Primitive types of the sync committee: blocks, chain segments, batches and proof tasks.

pub use batch::{
    evaluation_point, kzg_to_versioned_hash, BatchId, BlockBatch, DataProof, DataProofs,
    BLS_MODULUS, DATA_PROOF_SIZE, VERSIONED_HASH_VERSION_KZG,
};
mod batch;

pub use block::{Block, BlockId, BlockRef, BlockRefs, ShardId, MAIN_SHARD_ID};
mod block;

pub use error::{BatchError, SegmentError};
mod error;

pub use segment::{ChainSegment, ChainSegments, ParentRef};
mod segment;

pub use task::{ProofTask, ProofTaskStatus, TaskId};
mod task;
