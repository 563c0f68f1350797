//! The block fetcher of the sync committee, retrieving blocks from the L2 shards.

pub use client::L2Client;
mod client;

pub use error::{FetchError, L2ClientError};
mod error;

#[cfg(any(test, feature = "test-utils"))]
/// Common test helpers
pub mod test_utils;

use alloy_eips::{BlockId as RpcBlockId, BlockNumberOrTag};
use alloy_primitives::{BlockNumber, B256};
use futures::{stream, Stream, TryStreamExt};
use std::{collections::BTreeMap, ops::RangeInclusive};
use sync_committee_primitives::{
    Block, BlockRef, BlockRefs, ChainSegment, ChainSegments, ShardId, MAIN_SHARD_ID,
};

/// The number of blocks requested at once when fetching a range.
pub const FETCH_CHUNK_SIZE: u64 = 20;

/// Retrieves blocks and block references from the L2 shards.
#[derive(Debug, Clone)]
pub struct BlockFetcher<C> {
    client: C,
}

impl<C: L2Client> BlockFetcher<C> {
    /// Returns a new instance of [`BlockFetcher`].
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Returns the reference to the latest block of the shard.
    pub async fn latest_block_ref(&self, shard_id: ShardId) -> Result<BlockRef, FetchError> {
        self.block_ref_by_number(shard_id, BlockNumberOrTag::Latest).await
    }

    /// Returns the reference to the genesis block of the shard.
    pub async fn genesis_block_ref(&self, shard_id: ShardId) -> Result<BlockRef, FetchError> {
        self.block_ref_by_number(shard_id, BlockNumberOrTag::Earliest).await
    }

    /// Returns the reference to the block with the provided hash, or `None` if the shard does not
    /// hold such block.
    pub async fn try_get_block_ref(
        &self,
        shard_id: ShardId,
        hash: B256,
    ) -> Result<Option<BlockRef>, FetchError> {
        Ok(self.block_by_hash(shard_id, hash, false).await?.as_ref().map(Block::block_ref))
    }

    /// Returns the block with the provided hash, or `None` if the shard does not hold such block.
    pub async fn block_by_hash(
        &self,
        shard_id: ShardId,
        hash: B256,
        full_tx: bool,
    ) -> Result<Option<Block>, FetchError> {
        Ok(self.client.get_block(shard_id, RpcBlockId::from(hash), full_tx).await?)
    }

    async fn block_ref_by_number(
        &self,
        shard_id: ShardId,
        number: BlockNumberOrTag,
    ) -> Result<BlockRef, FetchError> {
        let block = RpcBlockId::Number(number);
        self.client
            .get_block(shard_id, block, false)
            .await?
            .map(|b| b.block_ref())
            .ok_or(FetchError::BlockNotFound { shard_id, block })
    }

    /// Returns the sorted ids of all the shards, the main shard included.
    pub async fn shard_ids(&self) -> Result<Vec<ShardId>, FetchError> {
        let mut ids = self.client.get_shard_id_list().await?;
        ids.push(MAIN_SHARD_ID);
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Returns a lazy stream over the blocks of the shard in the inclusive range. Blocks are
    /// requested in chunks of [`FETCH_CHUNK_SIZE`] as the stream is polled. The stream ends after
    /// the first error.
    pub fn fetch_blocks(
        &self,
        shard_id: ShardId,
        range: RangeInclusive<BlockNumber>,
    ) -> impl Stream<Item = Result<Block, FetchError>> + Send + '_ {
        let (from, to) = range.into_inner();

        stream::try_unfold(from, move |next| async move {
            if next > to {
                return Ok::<_, FetchError>(None);
            }
            let end = next.saturating_add(FETCH_CHUNK_SIZE - 1).min(to);
            tracing::trace!(
                target: "sync_committee::fetcher",
                shard = shard_id,
                from = next,
                to = end,
                "fetching blocks"
            );

            let blocks = self
                .client
                .get_blocks_range(shard_id, next, end, true, FETCH_CHUNK_SIZE as usize)
                .await?;
            let (first, last) = match (blocks.first(), blocks.last()) {
                (Some(first), Some(last)) => (first.number, last.number),
                _ => return Err(FetchError::EmptyRange { shard_id, from: next, to: end }),
            };
            if first != next || last > end {
                let got = if first == next { last } else { first };
                return Err(FetchError::UnexpectedBlock { shard_id, expected: next, got });
            }

            Ok(Some((stream::iter(blocks.into_iter().map(Ok::<_, FetchError>)), last + 1)))
        })
        .try_flatten()
    }

    /// Resolves the blocks to append to a batch for the provided main shard block.
    ///
    /// The main block references blocks of the execution shards. For every referenced shard, the
    /// returned segment goes from the block following the latest fetched reference of the shard,
    /// or from the lowest referenced block if the shard was never fetched, up to the highest
    /// referenced block. Shards whose referenced blocks were already fetched are skipped.
    pub async fn fetch_subgraph(
        &self,
        main_block: &Block,
        latest: &BlockRefs,
    ) -> Result<ChainSegments, FetchError> {
        let mut segments = vec![ChainSegment::new(vec![main_block.clone()])?];

        let mut children: BTreeMap<ShardId, Vec<Block>> = BTreeMap::new();
        for child in &main_block.child_blocks {
            if child.shard_id == MAIN_SHARD_ID {
                continue;
            }
            let block = self
                .block_by_hash(child.shard_id, child.hash, true)
                .await?
                .ok_or(FetchError::ChildBlockNotFound {
                    main_hash: main_block.hash,
                    child: *child,
                })?;
            children.entry(child.shard_id).or_default().push(block);
        }

        for (shard_id, mut blocks) in children {
            blocks.sort_unstable_by_key(|b| b.number);
            blocks.dedup_by_key(|b| b.number);
            let (Some(lowest), Some(highest)) = (blocks.first(), blocks.last()) else { continue };

            let from = match latest.get(&shard_id) {
                Some(latest) if latest.number >= highest.number => continue,
                Some(latest) => latest.number + 1,
                None => lowest.number,
            };
            if from == highest.number {
                segments.push(ChainSegment::new(vec![highest.clone()])?);
                continue;
            }

            let fetched: Vec<Block> =
                self.fetch_blocks(shard_id, from..=highest.number).try_collect().await?;
            let last = fetched.last().map(|b| b.hash).unwrap_or_default();
            if last != highest.hash {
                return Err(FetchError::SubgraphMismatch {
                    shard_id,
                    expected: highest.hash,
                    got: last,
                });
            }
            segments.push(ChainSegment::new(fetched)?);
        }

        tracing::trace!(
            target: "sync_committee::fetcher",
            main = main_block.number,
            shards = segments.len(),
            "resolved subgraph"
        );
        Ok(ChainSegments::from_segments(segments)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockL2Client;
    use futures::StreamExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_latest_and_genesis_refs() -> eyre::Result<()> {
        // Given
        let client = MockL2Client::new([1, 2]);
        client.produce_main_blocks(5);
        let fetcher = BlockFetcher::new(&client);

        // When
        let latest = fetcher.latest_block_ref(MAIN_SHARD_ID).await?;
        let genesis = fetcher.genesis_block_ref(MAIN_SHARD_ID).await?;

        // Then
        assert_eq!(latest.number, 5);
        assert_eq!(genesis.number, 0);
        assert_eq!(Some(genesis), fetcher.try_get_block_ref(MAIN_SHARD_ID, genesis.hash).await?);
        assert_eq!(None, fetcher.try_get_block_ref(MAIN_SHARD_ID, B256::repeat_byte(0x42)).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_latest_block_not_found() {
        let client = MockL2Client::new([]);
        let fetcher = BlockFetcher::new(&client);

        let err = fetcher.latest_block_ref(9).await.unwrap_err();
        assert!(matches!(err, FetchError::BlockNotFound { shard_id: 9, .. }));
    }

    #[tokio::test]
    async fn test_shard_ids_include_main_shard() -> eyre::Result<()> {
        let client = MockL2Client::new([3, 1, 2]);
        let fetcher = BlockFetcher::new(client);

        assert_eq!(fetcher.shard_ids().await?, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_blocks_paginates() -> eyre::Result<()> {
        // Given
        let client = Arc::new(MockL2Client::new([]));
        client.produce_main_blocks(45);
        let fetcher = BlockFetcher::new(client.clone());

        // When
        let blocks: Vec<Block> = fetcher.fetch_blocks(MAIN_SHARD_ID, 3..=44).try_collect().await?;

        // Then
        assert_eq!(blocks.len(), 42);
        assert_eq!(blocks.first().map(|b| b.number), Some(3));
        assert_eq!(blocks.last().map(|b| b.number), Some(44));
        assert_eq!(client.range_requests(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_blocks_is_lazy() -> eyre::Result<()> {
        let client = Arc::new(MockL2Client::new([]));
        client.produce_main_blocks(100);
        let fetcher = BlockFetcher::new(client.clone());

        let blocks: Vec<Block> =
            fetcher.fetch_blocks(MAIN_SHARD_ID, 1..=100).take(5).try_collect().await?;

        assert_eq!(blocks.len(), 5);
        assert_eq!(client.range_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_blocks_stops_on_error() -> eyre::Result<()> {
        // Given a chain shorter than the requested range
        let client = MockL2Client::new([]);
        client.produce_main_blocks(25);
        let fetcher = BlockFetcher::new(&client);

        // When
        let results: Vec<_> = fetcher.fetch_blocks(MAIN_SHARD_ID, 1..=60).collect().await;

        // Then all the existing blocks are yielded and the stream ends after the error.
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 25);
        assert!(matches!(results.last(), Some(Err(FetchError::EmptyRange { from: 26, .. }))));
        assert_eq!(results.len(), 26);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_subgraph_fills_gaps() -> eyre::Result<()> {
        // Given two execution shards, the first shard produced 3 blocks per main block.
        let client = MockL2Client::new([1, 2]);
        client.produce_blocks(1, 3);
        client.produce_main_blocks(1);
        let fetcher = BlockFetcher::new(&client);

        let main = client.block(MAIN_SHARD_ID, 1).expect("main block");
        let mut latest = BlockRefs::new();
        latest.insert(client.block(1, 0).expect("genesis").block_ref());

        // When
        let segments = fetcher.fetch_subgraph(&main, &latest).await?;

        // Then
        assert_eq!(segments.main_blocks_count(), 1);
        let shard_1 = segments.get(1).expect("shard 1 segment");
        assert_eq!(shard_1.earliest().number, 1);
        assert_eq!(shard_1.latest().number, 4);
        let shard_2 = segments.get(2).expect("shard 2 segment");
        assert_eq!(shard_2.blocks_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_subgraph_skips_fetched_shards() -> eyre::Result<()> {
        let client = MockL2Client::new([1]);
        client.produce_main_blocks(1);
        let fetcher = BlockFetcher::new(&client);

        let main = client.block(MAIN_SHARD_ID, 1).expect("main block");
        let latest: BlockRefs =
            [client.latest(1).expect("latest").block_ref()].into_iter().collect();

        let segments = fetcher.fetch_subgraph(&main, &latest).await?;

        assert!(segments.get(1).is_none());
        assert_eq!(segments.blocks_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_subgraph_missing_child() {
        let client = MockL2Client::new([1]);
        client.produce_main_blocks(1);
        let mut main = client.block(MAIN_SHARD_ID, 1).expect("main block");
        main.child_blocks[0].hash = B256::repeat_byte(0x11);
        let fetcher = BlockFetcher::new(&client);

        let err = fetcher.fetch_subgraph(&main, &BlockRefs::new()).await.unwrap_err();

        assert!(matches!(err, FetchError::ChildBlockNotFound { .. }));
    }
}
