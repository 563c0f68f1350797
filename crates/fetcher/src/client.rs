use crate::L2ClientError;
use alloy_eips::BlockId as RpcBlockId;
use alloy_primitives::BlockNumber;
use sync_committee_primitives::{Block, ShardId};

/// An instance of the trait can query the blocks of the L2 shards.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc, &)]
pub trait L2Client: Sync + Send {
    /// Returns the requested block. Returns `None` for an unknown hash, and
    /// [`L2ClientError::BlockNotFound`] for an unknown number or tag.
    async fn get_block(
        &self,
        shard_id: ShardId,
        block: RpcBlockId,
        full_tx: bool,
    ) -> Result<Option<Block>, L2ClientError>;

    /// Returns the blocks in the inclusive range, in ascending order. The client may return fewer
    /// blocks than requested if the end of the chain is reached.
    async fn get_blocks_range(
        &self,
        shard_id: ShardId,
        from: BlockNumber,
        to: BlockNumber,
        full_tx: bool,
        batch_size: usize,
    ) -> Result<Vec<Block>, L2ClientError>;

    /// Returns the ids of the execution shards.
    async fn get_shard_id_list(&self) -> Result<Vec<ShardId>, L2ClientError>;
}
