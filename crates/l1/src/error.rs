use crate::abi::IRollupContract;
use alloy_primitives::{Bytes, TxHash, B256};
use alloy_sol_types::SolError;
use std::{collections::HashMap, sync::LazyLock};

/// A revert reason of the rollup contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ContractError {
    /// The batch is already finalized.
    #[error("batch already finalized")]
    BatchAlreadyFinalized,
    /// The batch was never committed.
    #[error("batch not committed")]
    BatchNotCommitted,
    /// The batch was already committed.
    #[error("batch already committed")]
    BatchAlreadyCommitted,
    /// The old state root does not match the latest finalized state root.
    #[error("old state root mismatch")]
    OldStateRootMismatch,
    /// The batch index is invalid.
    #[error("invalid batch index")]
    InvalidBatchIndex,
    /// No data proof was provided.
    #[error("empty data proofs")]
    EmptyDataProofs,
    /// The new state root is invalid.
    #[error("invalid new state root")]
    InvalidNewStateRoot,
    /// The old state root is invalid.
    #[error("invalid old state root")]
    InvalidOldStateRoot,
    /// The new state root is already finalized.
    #[error("new state root already finalized")]
    NewStateRootAlreadyFinalized,
    /// The validity proof is invalid.
    #[error("invalid validity proof")]
    InvalidValidityProof,
    /// The data proof does not have the expected size.
    #[error("incorrect data proof size")]
    IncorrectDataProofSize,
    /// The public input of the proof is invalid.
    #[error("invalid public input for proof")]
    InvalidPublicInputForProof,
    /// The versioned hash is invalid.
    #[error("invalid versioned hash")]
    InvalidVersionedHash,
    /// The point evaluation precompile call failed.
    #[error("point evaluation precompile call failed")]
    CallPointEvaluationPrecompileFailed,
    /// The point evaluation precompile returned an unexpected output.
    #[error("unexpected point evaluation precompile output")]
    UnexpectedPointEvaluationPrecompileOutput,
    /// One of the data proofs is invalid.
    #[error("invalid data proof item")]
    InvalidDataProofItem,
    /// The number of data proofs does not match the number of blobs.
    #[error("data proofs and blob count mismatch")]
    DataProofsAndBlobCountMismatch,
    /// The genesis state root was already set.
    #[error("genesis state root already set")]
    GenesisStateRootAlreadySet,
    /// The rollback target is not a finalized state root.
    #[error("invalid rollback target")]
    InvalidRollbackTarget,
}

/// Maps the selector of every revert reason of the contract to its [`ContractError`].
static REVERT_REASONS: LazyLock<HashMap<[u8; 4], ContractError>> = LazyLock::new(|| {
    use IRollupContract as C;
    HashMap::from([
        (C::ErrorBatchAlreadyFinalized::SELECTOR, ContractError::BatchAlreadyFinalized),
        (C::ErrorBatchNotCommitted::SELECTOR, ContractError::BatchNotCommitted),
        (C::ErrorBatchAlreadyCommitted::SELECTOR, ContractError::BatchAlreadyCommitted),
        (C::ErrorOldStateRootMismatch::SELECTOR, ContractError::OldStateRootMismatch),
        (C::ErrorInvalidBatchIndex::SELECTOR, ContractError::InvalidBatchIndex),
        (C::ErrorEmptyDataProofs::SELECTOR, ContractError::EmptyDataProofs),
        (C::ErrorInvalidNewStateRoot::SELECTOR, ContractError::InvalidNewStateRoot),
        (C::ErrorInvalidOldStateRoot::SELECTOR, ContractError::InvalidOldStateRoot),
        (
            C::ErrorNewStateRootAlreadyFinalized::SELECTOR,
            ContractError::NewStateRootAlreadyFinalized,
        ),
        (C::ErrorInvalidValidityProof::SELECTOR, ContractError::InvalidValidityProof),
        (C::ErrorIncorrectDataProofSize::SELECTOR, ContractError::IncorrectDataProofSize),
        (C::ErrorInvalidPublicInputForProof::SELECTOR, ContractError::InvalidPublicInputForProof),
        (C::ErrorInvalidVersionedHash::SELECTOR, ContractError::InvalidVersionedHash),
        (
            C::ErrorCallPointEvaluationPrecompileFailed::SELECTOR,
            ContractError::CallPointEvaluationPrecompileFailed,
        ),
        (
            C::ErrorUnexpectedPointEvaluationPrecompileOutput::SELECTOR,
            ContractError::UnexpectedPointEvaluationPrecompileOutput,
        ),
        (C::ErrorInvalidDataProofItem::SELECTOR, ContractError::InvalidDataProofItem),
        (
            C::ErrorDataProofsAndBlobCountMismatch::SELECTOR,
            ContractError::DataProofsAndBlobCountMismatch,
        ),
        (C::ErrorGenesisStateRootAlreadySet::SELECTOR, ContractError::GenesisStateRootAlreadySet),
        (C::ErrorInvalidRollbackTarget::SELECTOR, ContractError::InvalidRollbackTarget),
    ])
});

impl ContractError {
    /// Decodes the revert data returned by the contract. Returns `None` if the selector is not a
    /// revert reason of the contract.
    pub fn decode(revert_data: &[u8]) -> Option<Self> {
        let selector: [u8; 4] = revert_data.get(..4)?.try_into().ok()?;
        REVERT_REASONS.get(&selector).copied()
    }

    /// Returns the name of the revert reason as declared by the contract.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BatchAlreadyFinalized => "ErrorBatchAlreadyFinalized",
            Self::BatchNotCommitted => "ErrorBatchNotCommitted",
            Self::BatchAlreadyCommitted => "ErrorBatchAlreadyCommitted",
            Self::OldStateRootMismatch => "ErrorOldStateRootMismatch",
            Self::InvalidBatchIndex => "ErrorInvalidBatchIndex",
            Self::EmptyDataProofs => "ErrorEmptyDataProofs",
            Self::InvalidNewStateRoot => "ErrorInvalidNewStateRoot",
            Self::InvalidOldStateRoot => "ErrorInvalidOldStateRoot",
            Self::NewStateRootAlreadyFinalized => "ErrorNewStateRootAlreadyFinalized",
            Self::InvalidValidityProof => "ErrorInvalidValidityProof",
            Self::IncorrectDataProofSize => "ErrorIncorrectDataProofSize",
            Self::InvalidPublicInputForProof => "ErrorInvalidPublicInputForProof",
            Self::InvalidVersionedHash => "ErrorInvalidVersionedHash",
            Self::CallPointEvaluationPrecompileFailed => {
                "ErrorCallPointEvaluationPrecompileFailed"
            }
            Self::UnexpectedPointEvaluationPrecompileOutput => {
                "ErrorUnexpectedPointEvaluationPrecompileOutput"
            }
            Self::InvalidDataProofItem => "ErrorInvalidDataProofItem",
            Self::DataProofsAndBlobCountMismatch => "ErrorDataProofsAndBlobCountMismatch",
            Self::GenesisStateRootAlreadySet => "ErrorGenesisStateRootAlreadySet",
            Self::InvalidRollbackTarget => "ErrorInvalidRollbackTarget",
        }
    }
}

/// An error occurring while interacting with the rollup contract.
#[derive(Debug, thiserror::Error)]
pub enum L1Error {
    /// The contract reverted with a known reason.
    #[error("contract reverted with {name}: {0}", name = .0.name())]
    Contract(#[from] ContractError),
    /// The contract reverted with an unknown reason.
    #[error("contract reverted with unknown data {0}")]
    UnknownRevert(Bytes),
    /// The old state root is zero.
    #[error("empty old state root")]
    EmptyOldStateRoot,
    /// The new state root is zero.
    #[error("empty new state root")]
    EmptyNewStateRoot,
    /// No data proof was provided.
    #[error("empty data proofs")]
    EmptyDataProofs,
    /// No validity proof was provided.
    #[error("empty validity proof")]
    EmptyValidityProof,
    /// The old state root does not match the finalized state root of the contract.
    #[error("old state root mismatch: contract has {expected}, got {actual}")]
    OldStateRootMismatch {
        /// The finalized state root of the contract.
        expected: B256,
        /// The provided old state root.
        actual: B256,
    },
    /// The number of data proofs does not match the number of versioned hashes.
    #[error("{proofs} data proofs provided for {hashes} blobs")]
    DataProofCountMismatch {
        /// The number of data proofs.
        proofs: usize,
        /// The number of versioned hashes.
        hashes: usize,
    },
    /// The transaction was included but failed.
    #[error("transaction {tx_hash} failed, revert reason: {reason:?}")]
    TransactionFailed {
        /// The hash of the transaction.
        tx_hash: TxHash,
        /// The revert reason recovered by simulating the transaction again.
        reason: Option<ContractError>,
    },
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] alloy_transport::TransportError),
    /// The receipt of the transaction could not be obtained.
    #[error(transparent)]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),
    /// Other contract call error.
    #[error(transparent)]
    Call(alloy_contract::Error),
}

impl L1Error {
    /// Returns the revert reason of the contract carried by the error, if any.
    pub const fn contract_error(&self) -> Option<ContractError> {
        match self {
            Self::Contract(err) => Some(*err),
            Self::OldStateRootMismatch { .. } => Some(ContractError::OldStateRootMismatch),
            Self::TransactionFailed { reason, .. } => *reason,
            _ => None,
        }
    }

    /// Returns true if the error carries the provided revert reason.
    pub fn is(&self, reason: ContractError) -> bool {
        self.contract_error() == Some(reason)
    }
}

impl From<alloy_contract::Error> for L1Error {
    fn from(err: alloy_contract::Error) -> Self {
        if let Some(data) = err.as_revert_data() {
            return ContractError::decode(&data).map_or(Self::UnknownRevert(data), Self::Contract);
        }
        match err {
            alloy_contract::Error::TransportError(err) => Self::Transport(err),
            err => Self::Call(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    #[test]
    fn test_decode_known_revert_reasons() {
        let data = IRollupContract::ErrorBatchAlreadyCommitted {}.abi_encode();
        assert_eq!(ContractError::decode(&data), Some(ContractError::BatchAlreadyCommitted));

        let data = IRollupContract::ErrorDataProofsAndBlobCountMismatch {
            dataProofsCount: U256::from(2),
            blobCount: U256::from(3),
        }
        .abi_encode();
        assert_eq!(
            ContractError::decode(&data),
            Some(ContractError::DataProofsAndBlobCountMismatch)
        );
    }

    #[test]
    fn test_decode_unknown_revert_reasons() {
        assert_eq!(ContractError::decode(&[0xde, 0xad, 0xbe, 0xef]), None);
        assert_eq!(ContractError::decode(&[0x01]), None);
    }

    #[test]
    fn test_revert_table_is_complete() {
        assert_eq!(REVERT_REASONS.len(), 19);
        for (selector, reason) in REVERT_REASONS.iter() {
            assert!(reason.name().starts_with("Error"));
            assert_eq!(ContractError::decode(selector), Some(*reason));
        }
    }

    #[test]
    fn test_old_root_mismatch_is_contract_error() {
        let err = L1Error::OldStateRootMismatch { expected: B256::ZERO, actual: B256::ZERO };
        assert!(err.is(ContractError::OldStateRootMismatch));
        assert!(!L1Error::EmptyValidityProof.is(ContractError::EmptyDataProofs));
    }

    #[test]
    fn test_contract_error_message_names_the_revert() {
        let err = L1Error::from(ContractError::BatchAlreadyCommitted);
        assert_eq!(
            err.to_string(),
            "contract reverted with ErrorBatchAlreadyCommitted: batch already committed"
        );
    }
}
