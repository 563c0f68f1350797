use alloy_sol_types::sol;

// Rollup contract of the sharded rollup.
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IRollupContract {
        struct PublicDataInfo {
            bytes32 l2Tol1Root;
            uint256 messageCount;
        }

        error ErrorBatchAlreadyFinalized();
        error ErrorBatchNotCommitted();
        error ErrorBatchAlreadyCommitted();
        error ErrorOldStateRootMismatch();
        error ErrorInvalidBatchIndex();
        error ErrorEmptyDataProofs();
        error ErrorInvalidNewStateRoot();
        error ErrorInvalidOldStateRoot();
        error ErrorNewStateRootAlreadyFinalized();
        error ErrorInvalidValidityProof();
        error ErrorIncorrectDataProofSize();
        error ErrorInvalidPublicInputForProof();
        error ErrorInvalidVersionedHash();
        error ErrorCallPointEvaluationPrecompileFailed();
        error ErrorUnexpectedPointEvaluationPrecompileOutput();
        error ErrorInvalidDataProofItem(uint256 proofIndex);
        error ErrorDataProofsAndBlobCountMismatch(uint256 dataProofsCount, uint256 blobCount);
        error ErrorGenesisStateRootAlreadySet();
        error ErrorInvalidRollbackTarget();

        function isBatchFinalized(string calldata batchIndex) external view returns (bool);
        function isBatchCommitted(string calldata batchIndex) external view returns (bool);
        function getLastFinalizedBatchIndex() external view returns (string memory);
        function finalizedStateRoots(string calldata batchIndex) external view returns (bytes32);
        function commitBatch(string calldata batchIndex, uint256 blobCount) external;
        function updateState(
            string calldata batchIndex,
            bytes32 oldStateRoot,
            bytes32 newStateRoot,
            bytes[] calldata dataProofs,
            bytes calldata validityProof,
            PublicDataInfo calldata publicDataInfo
        ) external;
        function verifyDataProof(bytes32 versionedHash, bytes calldata dataProof) external view;
        function setGenesisStateRoot(bytes32 stateRoot) external;
        function resetState(bytes32 targetStateRoot) external;
    }
}
