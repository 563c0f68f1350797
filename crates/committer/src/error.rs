use sync_committee_codec::BlobError;
use sync_committee_l1::L1Error;
use sync_committee_primitives::{BatchError, BatchId};

/// An error raised by a [`KzgBackend`](crate::KzgBackend).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("kzg error: {0}")]
pub struct KzgError(pub String);

impl From<c_kzg::Error> for KzgError {
    fn from(err: c_kzg::Error) -> Self {
        Self(err.to_string())
    }
}

/// The error type of the committer.
#[derive(Debug, thiserror::Error)]
pub enum CommitterError {
    /// An empty batch cannot be committed.
    #[error("cannot commit empty batch {0}")]
    EmptyBatch(BatchId),
    /// The batch could not be packed into blobs.
    #[error(transparent)]
    Blob(#[from] BlobError),
    /// The commitment or proof computation failed.
    #[error(transparent)]
    Kzg(#[from] KzgError),
    /// The batch could not be sealed.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// The rollup contract rejected the commitment.
    #[error(transparent)]
    L1(#[from] L1Error),
}

impl CommitterError {
    /// Returns the L1 error, if the error was raised by the rollup contract.
    pub const fn as_l1(&self) -> Option<&L1Error> {
        match self {
            Self::L1(err) => Some(err),
            _ => None,
        }
    }
}
