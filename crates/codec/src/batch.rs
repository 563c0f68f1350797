use crate::{BlobBuilder, CodecError};
use alloy_eips::eip4844::Blob;
use alloy_primitives::{BlockNumber, Bytes, FixedBytes, B256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use sync_committee_primitives::{Block, BlockBatch, ShardId};

/// The view of a block published on L1. Only the data required to re-execute the block is kept.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct PrunedBlock {
    /// The shard of the block.
    pub shard_id: ShardId,
    /// The block number.
    pub number: BlockNumber,
    /// The block hash.
    pub hash: B256,
    /// The hash of the parent block.
    pub parent_hash: B256,
    /// The block timestamp.
    pub timestamp: u64,
    /// The encoded transactions.
    pub transactions: Vec<Bytes>,
}

impl From<&Block> for PrunedBlock {
    fn from(block: &Block) -> Self {
        Self {
            shard_id: block.shard_id,
            number: block.number,
            hash: block.hash,
            parent_hash: block.parent_hash,
            timestamp: block.timestamp,
            transactions: block.transactions.clone(),
        }
    }
}

/// The view of a [`BlockBatch`] published on L1.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct PrunedBatch {
    /// The raw id of the batch.
    pub batch_id: FixedBytes<16>,
    /// The blocks of the batch, ordered by shard then by block number.
    pub blocks: Vec<PrunedBlock>,
}

impl From<&BlockBatch> for PrunedBatch {
    fn from(batch: &BlockBatch) -> Self {
        Self {
            batch_id: FixedBytes(*batch.id().as_bytes()),
            blocks: batch
                .blocks()
                .iter()
                .flat_map(|segment| segment.blocks().iter().map(PrunedBlock::from))
                .collect(),
        }
    }
}

/// Serializes the pruned view of the batch.
pub fn encode_batch(batch: &BlockBatch) -> Vec<u8> {
    let pruned = PrunedBatch::from(batch);
    let mut out = Vec::with_capacity(pruned.length());
    pruned.encode(&mut out);
    out
}

/// Recovers the pruned batch carried by the blobs. The zero padding following the payload is
/// ignored.
pub fn decode_batch(blobs: &[Blob]) -> Result<PrunedBatch, CodecError> {
    let data = BlobBuilder::decode(blobs)?;
    Ok(PrunedBatch::decode(&mut data.as_slice())?)
}
