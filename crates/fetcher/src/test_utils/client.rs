use super::next_block;
use crate::{L2Client, L2ClientError};
use alloy_eips::{BlockId as RpcBlockId, BlockNumberOrTag};
use alloy_primitives::{BlockNumber, B256};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use sync_committee_primitives::{Block, ShardId, MAIN_SHARD_ID};

/// An in-memory implementation of [`L2Client`]. Every shard starts with a genesis block.
#[derive(Debug)]
pub struct MockL2Client {
    shard_ids: Vec<ShardId>,
    chains: RwLock<HashMap<ShardId, Vec<Block>>>,
    range_requests: AtomicUsize,
}

impl MockL2Client {
    /// Returns a new [`MockL2Client`] for the provided execution shards.
    pub fn new(shard_ids: impl IntoIterator<Item = ShardId>) -> Self {
        let shard_ids: Vec<ShardId> = shard_ids.into_iter().collect();
        let chains = shard_ids
            .iter()
            .copied()
            .chain(std::iter::once(MAIN_SHARD_ID))
            .map(|shard_id| (shard_id, vec![next_block(shard_id, None, vec![])]))
            .collect();
        Self { shard_ids, chains: RwLock::new(chains), range_requests: AtomicUsize::new(0) }
    }

    /// Extends the chain of the shard with `count` random blocks.
    pub fn produce_blocks(&self, shard_id: ShardId, count: usize) -> Vec<Block> {
        let mut chains = self.chains.write();
        let chain = chains.entry(shard_id).or_default();
        let mut produced = Vec::with_capacity(count);
        for _ in 0..count {
            let parent = chain.last().map(Block::block_ref);
            let block = next_block(shard_id, parent.as_ref(), vec![]);
            chain.push(block.clone());
            produced.push(block);
        }
        produced
    }

    /// Produces `count` main shard blocks. Every main block references a fresh block of each
    /// execution shard.
    pub fn produce_main_blocks(&self, count: usize) -> Vec<Block> {
        let mut produced = Vec::with_capacity(count);
        for _ in 0..count {
            let children = self
                .shard_ids
                .iter()
                .flat_map(|shard_id| self.produce_blocks(*shard_id, 1))
                .map(|b| b.id())
                .collect();

            let mut chains = self.chains.write();
            let chain = chains.entry(MAIN_SHARD_ID).or_default();
            let parent = chain.last().map(Block::block_ref);
            let block = next_block(MAIN_SHARD_ID, parent.as_ref(), children);
            chain.push(block.clone());
            produced.push(block);
        }
        produced
    }

    /// Drops the blocks of the shard above the provided number.
    pub fn truncate(&self, shard_id: ShardId, number: BlockNumber) {
        if let Some(chain) = self.chains.write().get_mut(&shard_id) {
            chain.retain(|b| b.number <= number);
        }
    }

    /// Returns the block of the shard at the provided number.
    pub fn block(&self, shard_id: ShardId, number: BlockNumber) -> Option<Block> {
        self.chains.read().get(&shard_id)?.iter().find(|b| b.number == number).cloned()
    }

    /// Returns the latest block of the shard.
    pub fn latest(&self, shard_id: ShardId) -> Option<Block> {
        self.chains.read().get(&shard_id)?.last().cloned()
    }

    /// Returns the genesis block of the shard.
    pub fn genesis(&self, shard_id: ShardId) -> Option<Block> {
        self.block(shard_id, 0)
    }

    /// Returns the number of range requests served.
    pub fn range_requests(&self) -> usize {
        self.range_requests.load(Ordering::Relaxed)
    }

    fn by_hash(&self, shard_id: ShardId, hash: B256) -> Option<Block> {
        self.chains.read().get(&shard_id)?.iter().find(|b| b.hash == hash).cloned()
    }
}

#[async_trait::async_trait]
impl L2Client for MockL2Client {
    async fn get_block(
        &self,
        shard_id: ShardId,
        block: RpcBlockId,
        _full_tx: bool,
    ) -> Result<Option<Block>, L2ClientError> {
        let found = match block {
            RpcBlockId::Hash(hash) => return Ok(self.by_hash(shard_id, hash.block_hash)),
            RpcBlockId::Number(BlockNumberOrTag::Number(number)) => self.block(shard_id, number),
            RpcBlockId::Number(BlockNumberOrTag::Earliest) => self.genesis(shard_id),
            RpcBlockId::Number(_) => self.latest(shard_id),
        };
        found.map(Some).ok_or(L2ClientError::BlockNotFound { shard_id, block })
    }

    async fn get_blocks_range(
        &self,
        shard_id: ShardId,
        from: BlockNumber,
        to: BlockNumber,
        _full_tx: bool,
        batch_size: usize,
    ) -> Result<Vec<Block>, L2ClientError> {
        self.range_requests.fetch_add(1, Ordering::Relaxed);
        let chains = self.chains.read();
        Ok(chains
            .get(&shard_id)
            .map(|chain| {
                chain
                    .iter()
                    .filter(|b| (from..=to).contains(&b.number))
                    .take(batch_size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_shard_id_list(&self) -> Result<Vec<ShardId>, L2ClientError> {
        Ok(self.shard_ids.clone())
    }
}
