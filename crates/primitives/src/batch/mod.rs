use crate::{error::BatchError, BlockId, BlockRefs, ChainSegments};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

mod id;
pub use id::BatchId;

mod proof;
pub use proof::{
    evaluation_point, kzg_to_versioned_hash, DataProof, DataProofs, BLS_MODULUS, DATA_PROOF_SIZE,
    VERSIONED_HASH_VERSION_KZG,
};

/// A batch is the unit of submission to L1.
///
/// A batch collects per shard block ranges while it is open. Once sealed, the blocks are frozen
/// and the data proofs authenticating the blobs of the batch are attached. Transitions return a
/// new value and leave the original untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBatch {
    id: BatchId,
    parent_id: Option<BatchId>,
    blocks: ChainSegments,
    data_proofs: DataProofs,
    is_sealed: bool,
    created_at: SystemTime,
    updated_at: SystemTime,
}

impl BlockBatch {
    /// Returns a new open and empty [`BlockBatch`], following the provided parent.
    pub fn new(parent_id: Option<BatchId>, now: SystemTime) -> Self {
        Self {
            id: BatchId::new(),
            parent_id,
            blocks: ChainSegments::new(),
            data_proofs: DataProofs::default(),
            is_sealed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy of the batch extended with the provided segments.
    pub fn with_added_blocks(
        &self,
        segments: &ChainSegments,
        now: SystemTime,
    ) -> Result<Self, BatchError> {
        if self.is_sealed {
            return Err(BatchError::AlreadySealed(self.id));
        }
        let blocks = self.blocks.concat(segments)?;
        Ok(Self { blocks, updated_at: now, ..self.clone() })
    }

    /// Returns a sealed copy of the batch carrying the provided data proofs.
    pub fn seal(&self, data_proofs: DataProofs, now: SystemTime) -> Result<Self, BatchError> {
        if self.is_sealed {
            return Err(BatchError::AlreadySealed(self.id));
        }
        if self.is_empty() {
            return Err(BatchError::EmptyBatch(self.id));
        }
        if data_proofs.is_empty() {
            return Err(BatchError::MissingDataProofs(self.id));
        }
        Ok(Self { data_proofs, is_sealed: true, updated_at: now, ..self.clone() })
    }

    /// Returns the id of the batch.
    pub const fn id(&self) -> BatchId {
        self.id
    }

    /// Returns the id of the batch preceding this one.
    pub const fn parent_id(&self) -> Option<BatchId> {
        self.parent_id
    }

    /// Returns the blocks of the batch.
    pub const fn blocks(&self) -> &ChainSegments {
        &self.blocks
    }

    /// Returns the data proofs. Empty until the batch is sealed.
    pub const fn data_proofs(&self) -> &DataProofs {
        &self.data_proofs
    }

    /// Returns true if the batch is sealed.
    pub const fn is_sealed(&self) -> bool {
        self.is_sealed
    }

    /// Returns the creation time of the batch.
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns the time of the last change to the batch.
    pub const fn updated_at(&self) -> SystemTime {
        self.updated_at
    }

    /// Returns the time elapsed since the creation of the batch.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.created_at).unwrap_or_default()
    }

    /// Returns true if the batch holds no block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the number of main shard blocks in the batch.
    pub fn main_blocks_count(&self) -> usize {
        self.blocks.main_blocks_count()
    }

    /// Returns the number of blocks in the batch, across all shards.
    pub fn blocks_count(&self) -> usize {
        self.blocks.blocks_count()
    }

    /// Returns the reference to the first block of every shard of the batch.
    pub fn earliest_refs(&self) -> BlockRefs {
        self.blocks.earliest_refs()
    }

    /// Returns the reference to the last block of every shard of the batch.
    pub fn latest_refs(&self) -> BlockRefs {
        self.blocks.latest_refs()
    }

    /// Returns the ordered ids of the blocks of the batch.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.block_ids()
    }
}
