use alloy_eips::eip4844::env_settings::EnvKzgSettings;
use c_kzg::{Bytes32, Bytes48};
use sync_committee_primitives::DataProof;

/// Checks the KZG opening carried by a [`DataProof`], as the point evaluation precompile does.
#[auto_impl::auto_impl(Arc, &, Box)]
pub trait DataProofVerifier: core::fmt::Debug + Send + Sync {
    /// Returns true if the proof shows the committed blob evaluates to the claim at the point.
    fn verify_data_proof(&self, proof: &DataProof) -> bool;
}

/// A [`DataProofVerifier`] running the point evaluation with `c-kzg`.
#[derive(Debug, Clone)]
pub struct KzgDataProofVerifier {
    settings: EnvKzgSettings,
}

impl KzgDataProofVerifier {
    /// Returns a verifier using the Ethereum trusted setup.
    pub const fn new() -> Self {
        Self { settings: EnvKzgSettings::Default }
    }
}

impl Default for KzgDataProofVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProofVerifier for KzgDataProofVerifier {
    fn verify_data_proof(&self, proof: &DataProof) -> bool {
        let verified = Bytes48::from_bytes(proof.commitment()).and_then(|commitment| {
            let opening = Bytes48::from_bytes(proof.proof())?;
            self.settings.get().verify_kzg_proof(
                &commitment,
                &Bytes32::new(proof.point().0),
                &Bytes32::new(proof.claim().0),
                &opening,
            )
        });
        match verified {
            Ok(valid) => valid,
            Err(err) => {
                tracing::debug!(target: "sync_committee::l1", %err, "malformed data proof");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::B256;
    use c_kzg::{Blob, BYTES_PER_BLOB};
    use sync_committee_primitives::{evaluation_point, kzg_to_versioned_hash};

    /// Returns the versioned hash of a blob holding `seed` in its first field elements, along
    /// with a valid data proof of the blob.
    pub(crate) fn kzg_proof(seed: u8) -> eyre::Result<(B256, DataProof)> {
        let mut bytes = vec![0u8; BYTES_PER_BLOB];
        for element in 0..64 {
            bytes[element * 32 + 31] = seed.wrapping_add(element as u8);
        }
        let blob = Blob::from_bytes(&bytes)?;
        let settings = EnvKzgSettings::Default.get();

        let commitment = settings.blob_to_kzg_commitment(&blob)?.to_bytes();
        let hash = kzg_to_versioned_hash(commitment.as_slice());
        let point = evaluation_point(&hash);
        let (proof, claim) = settings.compute_kzg_proof(&blob, &Bytes32::new(point.0))?;

        let commitment: [u8; 48] = commitment.as_slice().try_into()?;
        let proof: [u8; 48] = proof.to_bytes().as_slice().try_into()?;
        let claim = B256::from_slice(claim.as_slice());
        Ok((hash, DataProof::new(point, claim, &commitment, &proof)))
    }

    #[test]
    fn test_kzg_verifier() -> eyre::Result<()> {
        let verifier = KzgDataProofVerifier::new();
        let (_, proof) = kzg_proof(1)?;
        assert!(verifier.verify_data_proof(&proof));

        // wrong claim
        let (commitment, opening) = (proof.commitment(), proof.proof());
        let commitment: [u8; 48] = commitment.try_into()?;
        let opening: [u8; 48] = opening.try_into()?;
        let forged = DataProof::new(proof.point(), B256::with_last_byte(1), &commitment, &opening);
        assert!(!verifier.verify_data_proof(&forged));

        // not a curve point
        let garbage = DataProof::new(proof.point(), proof.claim(), &[0xff; 48], &opening);
        assert!(!verifier.verify_data_proof(&garbage));
        Ok(())
    }
}
