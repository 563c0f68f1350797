pub use ::arbitrary::Arbitrary;

/// Test utils for arbitrary.
pub mod arbitrary;

/// A mock L2 client.
pub mod client;
pub use client::MockL2Client;

use crate::random;
use alloy_primitives::{Bytes, B256};
use sync_committee_primitives::{Block, BlockId, BlockRef, ShardId};

/// Returns a random block of the shard extending the provided parent, or a genesis block if no
/// parent is provided.
pub fn next_block(
    shard_id: ShardId,
    parent: Option<&BlockRef>,
    child_blocks: Vec<BlockId>,
) -> Block {
    let (number, parent_hash) = parent.map_or((0, B256::ZERO), |p| (p.number + 1, p.hash));
    Block {
        shard_id,
        number,
        hash: random!(B256),
        parent_hash,
        main_shard_hash: B256::ZERO,
        child_blocks,
        timestamp: 1_700_000_000 + number * 2,
        transactions: vec![Bytes::copy_from_slice(random!(B256).as_slice())],
    }
}

/// Returns a chain of `len` random blocks of the shard following the provided parent.
pub fn chain_from(shard_id: ShardId, parent: &BlockRef, len: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(len);
    let mut parent = *parent;
    for _ in 0..len {
        let block = next_block(shard_id, Some(&parent), vec![]);
        parent = block.block_ref();
        blocks.push(block);
    }
    blocks
}
