use crate::{error::SegmentError, Block, BlockId, BlockRef, BlockRefs, ShardId, MAIN_SHARD_ID};
use alloy_primitives::{BlockNumber, B256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A non-empty, contiguous sequence of blocks of a single shard, ordered by block number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSegment {
    blocks: Vec<Block>,
}

impl ChainSegment {
    /// Returns a new [`ChainSegment`] after checking the blocks are non-empty, belong to a single
    /// shard and form a contiguous chain.
    pub fn new(blocks: Vec<Block>) -> Result<Self, SegmentError> {
        let first = blocks.first().ok_or(SegmentError::Empty)?;
        let shard_id = first.shard_id;

        for pair in blocks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.shard_id != shard_id {
                return Err(SegmentError::ShardMismatch { expected: shard_id, got: next.shard_id });
            }
            check_link(&prev.block_ref(), next)?;
        }

        Ok(Self { blocks })
    }

    /// Returns the shard of the segment.
    pub fn shard_id(&self) -> ShardId {
        self.earliest().shard_id
    }

    /// Returns the first block of the segment.
    pub fn earliest(&self) -> &Block {
        // non-emptiness is checked on construction.
        &self.blocks[0]
    }

    /// Returns the last block of the segment.
    pub fn latest(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Returns the blocks of the segment.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the number of blocks in the segment.
    pub fn blocks_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the reference to the block preceding the segment.
    pub fn parent_ref(&self) -> ParentRef {
        let earliest = self.earliest();
        ParentRef {
            shard_id: earliest.shard_id,
            number: earliest.number.saturating_sub(1),
            hash: earliest.parent_hash,
        }
    }

    /// Returns a new segment made of self followed by `other`. The first block of `other` must
    /// directly extend the last block of self.
    pub fn concat(&self, other: &Self) -> Result<Self, SegmentError> {
        if other.shard_id() != self.shard_id() {
            return Err(SegmentError::ShardMismatch {
                expected: self.shard_id(),
                got: other.shard_id(),
            });
        }
        check_link(&self.latest().block_ref(), other.earliest())?;

        let mut blocks = Vec::with_capacity(self.blocks.len() + other.blocks.len());
        blocks.extend_from_slice(&self.blocks);
        blocks.extend_from_slice(&other.blocks);
        Ok(Self { blocks })
    }
}

/// Checks the `next` block directly extends the `prev` block.
fn check_link(prev: &BlockRef, next: &Block) -> Result<(), SegmentError> {
    if next.number != prev.number + 1 {
        return Err(SegmentError::NonContiguousBlocks {
            shard_id: prev.shard_id,
            expected: prev.number + 1,
            got: next.number,
        });
    }
    if next.parent_hash != prev.hash {
        return Err(SegmentError::ParentHashMismatch {
            shard_id: prev.shard_id,
            number: next.number,
            expected: prev.hash,
            got: next.parent_hash,
        });
    }
    Ok(())
}

/// The reference to the block preceding a [`ChainSegment`]. Unlike a [`BlockRef`], the parent
/// hash of the referenced block is not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    /// The shard of the block.
    pub shard_id: ShardId,
    /// The number of the block.
    pub number: BlockNumber,
    /// The hash of the block.
    pub hash: B256,
}

/// A mapping from [`ShardId`] to the [`ChainSegment`] of that shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSegments(BTreeMap<ShardId, ChainSegment>);

impl ChainSegments {
    /// Returns a new empty instance of [`ChainSegments`].
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds the segments from a list of per shard segments. Each shard may appear once.
    pub fn from_segments(
        segments: impl IntoIterator<Item = ChainSegment>,
    ) -> Result<Self, SegmentError> {
        let mut map = BTreeMap::new();
        for segment in segments {
            let shard_id = segment.shard_id();
            if map.insert(shard_id, segment).is_some() {
                return Err(SegmentError::DuplicateShard(shard_id));
            }
        }
        Ok(Self(map))
    }

    /// Returns new segments made of self followed by `other`. For every shard present in both,
    /// the segment of `other` must directly extend the segment of self.
    pub fn concat(&self, other: &Self) -> Result<Self, SegmentError> {
        let mut merged = self.0.clone();
        for (shard_id, segment) in &other.0 {
            let next = match self.0.get(shard_id) {
                Some(current) => current.concat(segment)?,
                None => segment.clone(),
            };
            merged.insert(*shard_id, next);
        }
        Ok(Self(merged))
    }

    /// Returns the segment of the provided shard.
    pub fn get(&self, shard_id: ShardId) -> Option<&ChainSegment> {
        self.0.get(&shard_id)
    }

    /// Returns the segment of the main shard.
    pub fn main_shard(&self) -> Option<&ChainSegment> {
        self.get(MAIN_SHARD_ID)
    }

    /// Returns an iterator over the segments, ordered by shard.
    pub fn iter(&self) -> impl Iterator<Item = &ChainSegment> {
        self.0.values()
    }

    /// Returns true if no segment is held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the total number of blocks across all shards.
    pub fn blocks_count(&self) -> usize {
        self.0.values().map(ChainSegment::blocks_count).sum()
    }

    /// Returns the number of main shard blocks.
    pub fn main_blocks_count(&self) -> usize {
        self.main_shard().map_or(0, ChainSegment::blocks_count)
    }

    /// Returns the reference to the first block of every shard.
    pub fn earliest_refs(&self) -> BlockRefs {
        self.0.values().map(|s| s.earliest().block_ref()).collect()
    }

    /// Returns the reference to the last block of every shard.
    pub fn latest_refs(&self) -> BlockRefs {
        self.0.values().map(|s| s.latest().block_ref()).collect()
    }

    /// Returns the reference to the block preceding every segment.
    pub fn parent_refs(&self) -> BTreeMap<ShardId, ParentRef> {
        self.0.iter().map(|(shard_id, s)| (*shard_id, s.parent_ref())).collect()
    }

    /// Returns the ids of all the blocks, ordered by shard then by block number.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.0.values().flat_map(|s| s.blocks().iter().map(Block::id)).collect()
    }
}

impl<'a> IntoIterator for &'a ChainSegments {
    type Item = &'a ChainSegment;
    type IntoIter = std::collections::btree_map::Values<'a, ShardId, ChainSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}
