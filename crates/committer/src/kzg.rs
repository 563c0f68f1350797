use crate::KzgError;
use alloy_eips::eip4844::{env_settings::EnvKzgSettings, Blob, Bytes48};
use alloy_primitives::B256;
use c_kzg::{Bytes32, KzgSettings};

/// The KZG primitives needed to commit to blobs.
#[auto_impl::auto_impl(Arc, &)]
pub trait KzgBackend: Send + Sync {
    /// Returns the commitment to the blob.
    fn blob_commitment(&self, blob: &Blob) -> Result<Bytes48, KzgError>;

    /// Returns the proof of the blob against its commitment.
    fn blob_proof(&self, blob: &Blob, commitment: &Bytes48) -> Result<Bytes48, KzgError>;

    /// Evaluates the blob polynomial at the point. Returns the proof of the evaluation and the
    /// claimed value.
    fn point_proof(&self, blob: &Blob, point: &B256) -> Result<(Bytes48, B256), KzgError>;

    /// Returns true if the proof shows the committed polynomial evaluates to `claim` at `point`.
    fn verify_point_proof(
        &self,
        commitment: &Bytes48,
        point: &B256,
        claim: &B256,
        proof: &Bytes48,
    ) -> Result<bool, KzgError>;
}

/// A [`KzgBackend`] computing commitments and proofs with `c-kzg`.
#[derive(Debug, Clone)]
pub struct CKzgBackend {
    settings: EnvKzgSettings,
}

impl CKzgBackend {
    /// Returns a backend using the Ethereum trusted setup.
    pub const fn new() -> Self {
        Self { settings: EnvKzgSettings::Default }
    }

    /// Returns a backend using the provided settings.
    pub const fn with_settings(settings: EnvKzgSettings) -> Self {
        Self { settings }
    }

    fn settings(&self) -> &KzgSettings {
        self.settings.get()
    }
}

impl Default for CKzgBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn to_ckzg_blob(blob: &Blob) -> Result<c_kzg::Blob, KzgError> {
    Ok(c_kzg::Blob::from_bytes(blob.as_slice())?)
}

fn to_bytes48(bytes: &Bytes48) -> c_kzg::Bytes48 {
    c_kzg::Bytes48::new(bytes.0)
}

impl KzgBackend for CKzgBackend {
    fn blob_commitment(&self, blob: &Blob) -> Result<Bytes48, KzgError> {
        let commitment = self.settings().blob_to_kzg_commitment(&to_ckzg_blob(blob)?)?;
        Ok(Bytes48::from_slice(commitment.to_bytes().as_slice()))
    }

    fn blob_proof(&self, blob: &Blob, commitment: &Bytes48) -> Result<Bytes48, KzgError> {
        let blob = to_ckzg_blob(blob)?;
        let proof = self.settings().compute_blob_kzg_proof(&blob, &to_bytes48(commitment))?;
        Ok(Bytes48::from_slice(proof.to_bytes().as_slice()))
    }

    fn point_proof(&self, blob: &Blob, point: &B256) -> Result<(Bytes48, B256), KzgError> {
        let (proof, claim) =
            self.settings().compute_kzg_proof(&to_ckzg_blob(blob)?, &Bytes32::new(point.0))?;
        Ok((Bytes48::from_slice(proof.to_bytes().as_slice()), B256::from_slice(claim.as_slice())))
    }

    fn verify_point_proof(
        &self,
        commitment: &Bytes48,
        point: &B256,
        claim: &B256,
        proof: &Bytes48,
    ) -> Result<bool, KzgError> {
        Ok(self.settings().verify_kzg_proof(
            &to_bytes48(commitment),
            &Bytes32::new(point.0),
            &Bytes32::new(claim.0),
            &to_bytes48(proof),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_committee_codec::BlobBuilder;
    use sync_committee_primitives::{evaluation_point, kzg_to_versioned_hash};

    #[test]
    fn test_ckzg_point_proof_verifies() -> eyre::Result<()> {
        // Given
        let backend = CKzgBackend::new();
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let blobs = BlobBuilder::new(1).encode(&data)?;
        let blob = &blobs[0];

        // When
        let commitment = backend.blob_commitment(blob)?;
        let point = evaluation_point(&kzg_to_versioned_hash(commitment.as_slice()));
        let (proof, claim) = backend.point_proof(blob, &point)?;

        // Then
        assert!(backend.verify_point_proof(&commitment, &point, &claim, &proof)?);
        assert!(!backend.verify_point_proof(&commitment, &point, &B256::ZERO, &proof)?);
        backend.blob_proof(blob, &commitment)?;

        Ok(())
    }
}
