use crate::{CommitterError, KzgBackend};
use alloy_eips::eip4844::BlobTransactionSidecar;
use alloy_primitives::B256;
use sync_committee_codec::{encode_batch, BlobBuilder};
use sync_committee_primitives::{
    evaluation_point, kzg_to_versioned_hash, BlockBatch, DataProof, DataProofs,
};

/// The commitment to the blobs of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommitment {
    /// The blobs along with their commitments and proofs.
    pub sidecar: BlobTransactionSidecar,
    /// The versioned hash of every blob.
    pub versioned_hashes: Vec<B256>,
    /// The data proof of every blob.
    pub data_proofs: DataProofs,
}

/// Packs batches into blobs and computes the commitments and data proofs of the blobs.
#[derive(Debug, Clone)]
pub struct CommitPreparer<K> {
    builder: BlobBuilder,
    kzg: K,
}

impl<K: KzgBackend> CommitPreparer<K> {
    /// Returns a new [`CommitPreparer`] producing at most `max_blobs` blobs per batch.
    pub const fn new(max_blobs: usize, kzg: K) -> Self {
        Self { builder: BlobBuilder::new(max_blobs), kzg }
    }

    /// Returns the blob builder used to pack batches.
    pub const fn blob_builder(&self) -> &BlobBuilder {
        &self.builder
    }

    /// Returns the KZG backend.
    pub const fn kzg(&self) -> &K {
        &self.kzg
    }

    /// Computes the commitment to the batch.
    ///
    /// The pruned batch is packed into blobs. Every blob is committed to and evaluated at a
    /// point derived from its versioned hash, which yields the data proof of the blob.
    pub fn prepare(&self, batch: &BlockBatch) -> Result<PreparedCommitment, CommitterError> {
        if batch.is_empty() {
            return Err(CommitterError::EmptyBatch(batch.id()));
        }

        let payload = encode_batch(batch);
        let blobs = self.builder.encode(&payload)?;

        let mut commitments = Vec::with_capacity(blobs.len());
        let mut proofs = Vec::with_capacity(blobs.len());
        let mut versioned_hashes = Vec::with_capacity(blobs.len());
        let mut data_proofs = Vec::with_capacity(blobs.len());

        for blob in &blobs {
            let commitment = self.kzg.blob_commitment(blob)?;
            let proof = self.kzg.blob_proof(blob, &commitment)?;

            let versioned_hash = kzg_to_versioned_hash(commitment.as_slice());
            let point = evaluation_point(&versioned_hash);
            let (point_proof, claim) = self.kzg.point_proof(blob, &point)?;

            data_proofs.push(DataProof::new(point, claim, &commitment.0, &point_proof.0));
            versioned_hashes.push(versioned_hash);
            commitments.push(commitment);
            proofs.push(proof);
        }

        tracing::debug!(
            target: "sync_committee::committer",
            batch_id = %batch.id(),
            payload_size = payload.len(),
            blobs = blobs.len(),
            "prepared batch commitment"
        );

        Ok(PreparedCommitment {
            sidecar: BlobTransactionSidecar::new(blobs, commitments, proofs),
            versioned_hashes,
            data_proofs: data_proofs.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{batch_with_blocks, MockKzg};
    use sync_committee_codec::{decode_batch, BlobError};

    #[test]
    fn test_prepare_rejects_empty_batch() {
        let preparer = CommitPreparer::new(6, MockKzg);
        let batch = BlockBatch::new(None, std::time::SystemTime::now());

        let err = preparer.prepare(&batch).unwrap_err();

        assert!(matches!(err, CommitterError::EmptyBatch(id) if id == batch.id()));
    }

    #[test]
    fn test_prepare_produces_one_data_proof_per_blob() -> eyre::Result<()> {
        // Given
        let preparer = CommitPreparer::new(6, MockKzg);
        let batch = batch_with_blocks(20, 8_000);

        // When
        let prepared = preparer.prepare(&batch)?;

        // Then
        let blobs = prepared.sidecar.blobs.len();
        assert!(blobs > 1);
        assert_eq!(prepared.sidecar.commitments.len(), blobs);
        assert_eq!(prepared.sidecar.proofs.len(), blobs);
        assert_eq!(prepared.versioned_hashes.len(), blobs);
        assert_eq!(prepared.data_proofs.len(), blobs);

        for (hash, proof) in prepared.versioned_hashes.iter().zip(prepared.data_proofs.iter()) {
            assert_eq!(proof.versioned_hash(), *hash);
            assert_eq!(proof.point(), evaluation_point(hash));
        }
        let sidecar_hashes: Vec<B256> = prepared.sidecar.versioned_hashes().collect();
        assert_eq!(prepared.versioned_hashes, sidecar_hashes);

        let decoded = decode_batch(&prepared.sidecar.blobs)?;
        assert_eq!(decoded.blocks.len(), 20);

        Ok(())
    }

    #[test]
    fn test_prepare_is_deterministic() -> eyre::Result<()> {
        let preparer = CommitPreparer::new(6, MockKzg);
        let batch = batch_with_blocks(3, 100);

        assert_eq!(preparer.prepare(&batch)?, preparer.prepare(&batch)?);
        Ok(())
    }

    #[test]
    fn test_prepare_rejects_oversized_batch() {
        let preparer = CommitPreparer::new(1, MockKzg);
        let batch = batch_with_blocks(20, 8_000);

        let err = preparer.prepare(&batch).unwrap_err();

        assert!(matches!(err, CommitterError::Blob(BlobError::TooLarge { .. })));
    }
}
