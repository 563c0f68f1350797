use alloy_primitives::{keccak256, uint, Bytes, FixedBytes, B256, U256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The size in bytes of a [`DataProof`].
pub const DATA_PROOF_SIZE: usize = 160;

/// The version byte of the versioned hash of a KZG commitment.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// The order of the scalar field of the BLS12-381 curve.
pub const BLS_MODULUS: U256 =
    uint!(52435875175126190479447740508185965837690552500527637822603658699938581184513_U256);

const POINT_END: usize = 32;
const CLAIM_END: usize = 64;
const COMMITMENT_END: usize = 112;

/// The proof authenticating the content of a blob on L1 without sending the blob itself.
///
/// Laid out as `point (32) | claim (32) | commitment (48) | proof (48)`, matching the input of the
/// point evaluation precompile minus the versioned hash, which the contract derives from the
/// commitment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Deref,
)]
#[cfg_attr(any(test, feature = "arbitrary"), derive(arbitrary::Arbitrary))]
pub struct DataProof(FixedBytes<DATA_PROOF_SIZE>);

impl DataProof {
    /// Returns a new [`DataProof`] from its parts.
    pub fn new(point: B256, claim: B256, commitment: &[u8; 48], proof: &[u8; 48]) -> Self {
        let mut bytes = [0u8; DATA_PROOF_SIZE];
        bytes[..POINT_END].copy_from_slice(point.as_slice());
        bytes[POINT_END..CLAIM_END].copy_from_slice(claim.as_slice());
        bytes[CLAIM_END..COMMITMENT_END].copy_from_slice(commitment);
        bytes[COMMITMENT_END..].copy_from_slice(proof);
        Self(FixedBytes(bytes))
    }

    /// Returns the evaluation point.
    pub fn point(&self) -> B256 {
        B256::from_slice(&self.0[..POINT_END])
    }

    /// Returns the claimed evaluation of the blob at the point.
    pub fn claim(&self) -> B256 {
        B256::from_slice(&self.0[POINT_END..CLAIM_END])
    }

    /// Returns the commitment to the blob.
    pub fn commitment(&self) -> &[u8] {
        &self.0[CLAIM_END..COMMITMENT_END]
    }

    /// Returns the opening proof at the point.
    pub fn proof(&self) -> &[u8] {
        &self.0[COMMITMENT_END..]
    }

    /// Returns the versioned hash of the blob commitment.
    pub fn versioned_hash(&self) -> B256 {
        kzg_to_versioned_hash(self.commitment())
    }

    /// Returns the proof as [`Bytes`], as expected by the contract.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.0.as_slice())
    }
}

/// Returns the versioned hash of the KZG commitment: its sha256 digest with the first byte
/// replaced by the version.
pub fn kzg_to_versioned_hash(commitment: &[u8]) -> B256 {
    let mut hash: [u8; 32] = Sha256::digest(commitment).into();
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    B256::new(hash)
}

/// Returns the point at which the blob with the provided versioned hash is evaluated. The point
/// is derived from the keccak digest of the hash, reduced into the scalar field.
pub fn evaluation_point(versioned_hash: &B256) -> B256 {
    let digest = U256::from_be_bytes(keccak256(versioned_hash).0);
    B256::from(digest.reduce_mod(BLS_MODULUS))
}

/// The data proofs of a batch, one per blob in blob order.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::From,
    derive_more::IntoIterator,
)]
pub struct DataProofs(#[into_iterator(owned, ref)] Vec<DataProof>);

impl DataProofs {
    /// Returns the proofs encoded for the contract.
    pub fn to_bytes_vec(&self) -> Vec<Bytes> {
        self.0.iter().map(DataProof::to_bytes).collect()
    }
}

impl FromIterator<DataProof> for DataProofs {
    fn from_iter<T: IntoIterator<Item = DataProof>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
