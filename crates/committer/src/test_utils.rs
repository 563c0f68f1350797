//! Test helpers of the committer.

use crate::{KzgBackend, KzgError};
use alloy_eips::eip4844::{Blob, Bytes48};
use alloy_primitives::{keccak256, Bytes, B256};
use std::time::SystemTime;
use sync_committee_l1::DataProofVerifier;
use sync_committee_primitives::{
    Block, BlockBatch, ChainSegment, ChainSegments, DataProof, MAIN_SHARD_ID,
};

/// A [`KzgBackend`] deriving commitments and proofs from hashes. The outputs are deterministic
/// and consistent with each other, but carry no cryptographic meaning.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockKzg;

fn to_bytes48(hash: B256) -> Bytes48 {
    let mut bytes = [0u8; 48];
    bytes[..32].copy_from_slice(hash.as_slice());
    bytes[32..].copy_from_slice(&hash[..16]);
    Bytes48::from(bytes)
}

impl MockKzg {
    fn claim(commitment: &Bytes48, point: &B256) -> B256 {
        keccak256([commitment.as_slice(), point.as_slice()].concat())
    }

    fn proof(commitment: &Bytes48, point: &B256, claim: &B256) -> Bytes48 {
        to_bytes48(keccak256([commitment.as_slice(), point.as_slice(), claim.as_slice()].concat()))
    }
}

impl KzgBackend for MockKzg {
    fn blob_commitment(&self, blob: &Blob) -> Result<Bytes48, KzgError> {
        Ok(to_bytes48(keccak256(blob)))
    }

    fn blob_proof(&self, _blob: &Blob, commitment: &Bytes48) -> Result<Bytes48, KzgError> {
        Ok(to_bytes48(keccak256(commitment)))
    }

    fn point_proof(&self, blob: &Blob, point: &B256) -> Result<(Bytes48, B256), KzgError> {
        let commitment = self.blob_commitment(blob)?;
        let claim = Self::claim(&commitment, point);
        Ok((Self::proof(&commitment, point, &claim), claim))
    }

    fn verify_point_proof(
        &self,
        commitment: &Bytes48,
        point: &B256,
        claim: &B256,
        proof: &Bytes48,
    ) -> Result<bool, KzgError> {
        Ok(*claim == Self::claim(commitment, point) &&
            *proof == Self::proof(commitment, point, claim))
    }
}

impl DataProofVerifier for MockKzg {
    fn verify_data_proof(&self, proof: &DataProof) -> bool {
        let commitment = Bytes48::from_slice(proof.commitment());
        let opening = Bytes48::from_slice(proof.proof());
        self.verify_point_proof(&commitment, &proof.point(), &proof.claim(), &opening)
            .unwrap_or_default()
    }
}

/// Returns an open batch holding `count` main shard blocks, each carrying a single transaction
/// of `tx_size` bytes.
pub fn batch_with_blocks(count: u64, tx_size: usize) -> BlockBatch {
    let blocks: Vec<Block> = (1..=count)
        .map(|number| Block {
            shard_id: MAIN_SHARD_ID,
            number,
            hash: keccak256(number.to_be_bytes()),
            parent_hash: keccak256((number - 1).to_be_bytes()),
            main_shard_hash: B256::ZERO,
            child_blocks: vec![],
            timestamp: number,
            transactions: vec![Bytes::from(vec![(number % 251) as u8; tx_size])],
        })
        .collect();

    let now = SystemTime::now();
    let segments = ChainSegment::new(blocks)
        .and_then(|segment| ChainSegments::from_segments([segment]))
        .expect("blocks form a chain");
    BlockBatch::new(None, now).with_added_blocks(&segments, now).expect("batch is open")
}
