use alloy_primitives::{BlockNumber, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The identifier of a shard.
pub type ShardId = u32;

/// The identifier of the main shard. The main shard coordinates the execution shards by
/// referencing their blocks.
pub const MAIN_SHARD_ID: ShardId = 0;

/// Identifies a block across shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct BlockId {
    /// The shard the block belongs to.
    pub shard_id: ShardId,
    /// The hash of the block.
    pub hash: B256,
}

impl BlockId {
    /// Returns a new instance of [`BlockId`].
    pub const fn new(shard_id: ShardId, hash: B256) -> Self {
        Self { shard_id, hash }
    }
}

impl core::fmt::Display for BlockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.shard_id, self.hash)
    }
}

/// A lightweight pointer into a shard's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct BlockRef {
    /// The shard the block belongs to.
    pub shard_id: ShardId,
    /// The block number.
    pub number: BlockNumber,
    /// The block hash.
    pub hash: B256,
    /// The hash of the parent block.
    pub parent_hash: B256,
}

impl BlockRef {
    /// Returns a new instance of [`BlockRef`].
    pub const fn new(
        shard_id: ShardId,
        number: BlockNumber,
        hash: B256,
        parent_hash: B256,
    ) -> Self {
        Self { shard_id, number, hash, parent_hash }
    }

    /// Returns the [`BlockId`] of the referenced block.
    pub const fn id(&self) -> BlockId {
        BlockId::new(self.shard_id, self.hash)
    }

    /// Returns true if the provided block directly extends the referenced block.
    pub fn is_parent_of(&self, block: &Block) -> bool {
        self.shard_id == block.shard_id &&
            self.number + 1 == block.number &&
            self.hash == block.parent_hash
    }
}

impl core::fmt::Display for BlockRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "BlockRef {{ shard: {}, number: {}, hash: {} }}",
            self.shard_id, self.number, self.hash
        )
    }
}

impl From<&Block> for BlockRef {
    fn from(block: &Block) -> Self {
        Self {
            shard_id: block.shard_id,
            number: block.number,
            hash: block.hash,
            parent_hash: block.parent_hash,
        }
    }
}

/// A block of one of the rollup shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct Block {
    /// The shard the block belongs to.
    pub shard_id: ShardId,
    /// The block number.
    pub number: BlockNumber,
    /// The block hash.
    pub hash: B256,
    /// The hash of the parent block.
    pub parent_hash: B256,
    /// The hash of the main shard block this block was produced against. Zero for main shard
    /// blocks.
    pub main_shard_hash: B256,
    /// The execution shard blocks referenced by this block. Only populated for main shard blocks.
    pub child_blocks: Vec<BlockId>,
    /// The block timestamp.
    pub timestamp: u64,
    /// The encoded transactions of the block.
    pub transactions: Vec<Bytes>,
}

impl Block {
    /// Returns the [`BlockId`] of the block.
    pub const fn id(&self) -> BlockId {
        BlockId::new(self.shard_id, self.hash)
    }

    /// Returns the [`BlockRef`] of the block.
    pub fn block_ref(&self) -> BlockRef {
        self.into()
    }

    /// Returns true if the block belongs to the main shard.
    pub const fn is_main_shard(&self) -> bool {
        self.shard_id == MAIN_SHARD_ID
    }
}

/// A mapping from [`ShardId`] to a [`BlockRef`], used to track the latest fetched or committed
/// position per shard.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::IntoIterator,
)]
pub struct BlockRefs(#[into_iterator(owned, ref)] BTreeMap<ShardId, BlockRef>);

impl BlockRefs {
    /// Returns a new empty instance of [`BlockRefs`].
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the reference for the main shard, if any.
    pub fn main_shard(&self) -> Option<&BlockRef> {
        self.0.get(&MAIN_SHARD_ID)
    }

    /// Inserts the reference, replacing the reference previously held for the same shard.
    pub fn insert(&mut self, block_ref: BlockRef) -> Option<BlockRef> {
        self.0.insert(block_ref.shard_id, block_ref)
    }

    /// Merges the provided references into self. References from `other` take precedence.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Removes all the references.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<BlockRef> for BlockRefs {
    fn from_iter<T: IntoIterator<Item = BlockRef>>(iter: T) -> Self {
        Self(iter.into_iter().map(|r| (r.shard_id, r)).collect())
    }
}
