use crate::{
    contract::check_update_state, ContractError, DataProofVerifier, KzgDataProofVerifier, L1Error,
    RollupContract, UpdateStateRequest,
};
use alloy_eips::eip4844::BlobTransactionSidecar;
use alloy_primitives::B256;
use parking_lot::Mutex;
use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};
use sync_committee_primitives::{evaluation_point, BatchId, DataProofs};

#[derive(Debug, Default)]
struct State {
    /// The finalized state roots, oldest first, along with the batch that finalized them. The
    /// genesis state root has no batch.
    finalized_roots: Vec<(Option<BatchId>, B256)>,
    committed: HashSet<BatchId>,
    finalized: HashSet<BatchId>,
    commit_failures: VecDeque<ContractError>,
}

/// An in-memory [`RollupContract`] used when no L1 is configured. It enforces the same rules as
/// the deployed contract, except for the verification of the validity proofs. Data proofs are
/// checked with the point evaluation of the [`DataProofVerifier`].
#[derive(Debug)]
pub struct NoopRollupContract {
    state: Mutex<State>,
    verifier: Arc<dyn DataProofVerifier>,
}

impl NoopRollupContract {
    /// Returns a new [`NoopRollupContract`] without genesis state root, verifying the data proofs
    /// with `c-kzg`.
    pub fn new() -> Self {
        Self::with_verifier(KzgDataProofVerifier::new())
    }

    /// Returns a new [`NoopRollupContract`] verifying the data proofs with the provided verifier.
    pub fn with_verifier(verifier: impl DataProofVerifier + 'static) -> Self {
        Self { state: Mutex::default(), verifier: Arc::new(verifier) }
    }

    /// Makes the next call to [`RollupContract::commit_batch`] revert with the provided reason.
    pub fn fail_next_commit(&self, reason: ContractError) {
        self.state.lock().commit_failures.push_back(reason);
    }
}

impl Default for NoopRollupContract {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RollupContract for NoopRollupContract {
    async fn set_genesis_state_root(&self, state_root: B256) -> Result<(), L1Error> {
        if state_root.is_zero() {
            return Err(L1Error::EmptyNewStateRoot);
        }
        let mut state = self.state.lock();
        if !state.finalized_roots.is_empty() {
            return Err(ContractError::GenesisStateRootAlreadySet.into());
        }
        state.finalized_roots.push((None, state_root));
        Ok(())
    }

    async fn update_state(&self, request: UpdateStateRequest) -> Result<(), L1Error> {
        check_update_state(self, &request).await?;

        let mut state = self.state.lock();
        if state.finalized_roots.iter().any(|(_, root)| *root == request.new_state_root) {
            return Err(ContractError::NewStateRootAlreadyFinalized.into());
        }
        state.finalized_roots.push((Some(request.batch_id), request.new_state_root));
        state.finalized.insert(request.batch_id);
        tracing::debug!(
            target: "sync_committee::l1",
            batch_id = %request.batch_id,
            root = %request.new_state_root,
            "finalized state root"
        );
        Ok(())
    }

    async fn latest_finalized_state_root(&self) -> Result<B256, L1Error> {
        Ok(self.state.lock().finalized_roots.last().map(|(_, root)| *root).unwrap_or_default())
    }

    async fn verify_data_proofs(
        &self,
        versioned_hashes: &[B256],
        data_proofs: &DataProofs,
    ) -> Result<(), L1Error> {
        if versioned_hashes.len() != data_proofs.len() {
            return Err(L1Error::DataProofCountMismatch {
                proofs: data_proofs.len(),
                hashes: versioned_hashes.len(),
            });
        }
        for (hash, proof) in versioned_hashes.iter().zip(data_proofs.iter()) {
            if proof.versioned_hash() != *hash {
                return Err(ContractError::InvalidVersionedHash.into());
            }
            if proof.point() != evaluation_point(hash) {
                return Err(ContractError::InvalidPublicInputForProof.into());
            }
            if !self.verifier.verify_data_proof(proof) {
                return Err(ContractError::InvalidDataProofItem.into());
            }
        }
        Ok(())
    }

    async fn commit_batch(
        &self,
        batch_id: BatchId,
        sidecar: BlobTransactionSidecar,
    ) -> Result<(), L1Error> {
        let mut state = self.state.lock();
        if let Some(reason) = state.commit_failures.pop_front() {
            return Err(reason.into());
        }
        if state.finalized.contains(&batch_id) {
            return Err(ContractError::BatchAlreadyFinalized.into());
        }
        if !state.committed.insert(batch_id) {
            return Err(ContractError::BatchAlreadyCommitted.into());
        }
        tracing::debug!(
            target: "sync_committee::l1",
            %batch_id,
            blobs = sidecar.blobs.len(),
            "committed batch"
        );
        Ok(())
    }

    async fn rollback_state(&self, target_state_root: B256) -> Result<(), L1Error> {
        let mut state = self.state.lock();
        let position = state
            .finalized_roots
            .iter()
            .position(|(_, root)| *root == target_state_root)
            .ok_or(ContractError::InvalidRollbackTarget)?;

        let State { finalized_roots, committed, finalized, .. } = &mut *state;
        for (batch_id, _) in finalized_roots.drain(position + 1..) {
            if let Some(batch_id) = batch_id {
                finalized.remove(&batch_id);
            }
        }
        committed.retain(|batch_id| finalized.contains(batch_id));
        Ok(())
    }

    async fn is_batch_committed(&self, batch_id: BatchId) -> Result<bool, L1Error> {
        Ok(self.state.lock().committed.contains(&batch_id))
    }

    async fn is_batch_finalized(&self, batch_id: BatchId) -> Result<bool, L1Error> {
        Ok(self.state.lock().finalized.contains(&batch_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::tests::kzg_proof;
    use alloy_primitives::Bytes;
    use sync_committee_primitives::{kzg_to_versioned_hash, DataProof};

    fn proof_for(commitment: [u8; 48]) -> (B256, DataProof) {
        let hash = kzg_to_versioned_hash(&commitment);
        (hash, DataProof::new(evaluation_point(&hash), B256::ZERO, &commitment, &[0; 48]))
    }

    fn request(batch_id: BatchId, old: B256, new: B256) -> UpdateStateRequest {
        UpdateStateRequest {
            batch_id,
            old_state_root: old,
            new_state_root: new,
            data_proofs: vec![proof_for([1; 48]).1].into(),
            validity_proof: Bytes::from_static(&[1, 2, 3]),
            public_data: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_genesis_can_only_be_set_once() -> eyre::Result<()> {
        let contract = NoopRollupContract::new();
        assert_eq!(contract.latest_finalized_state_root().await?, B256::ZERO);

        contract.set_genesis_state_root(B256::repeat_byte(1)).await?;
        let err = contract.set_genesis_state_root(B256::repeat_byte(2)).await.unwrap_err();

        assert!(err.is(ContractError::GenesisStateRootAlreadySet));
        assert_eq!(contract.latest_finalized_state_root().await?, B256::repeat_byte(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_twice_fails() -> eyre::Result<()> {
        let contract = NoopRollupContract::new();
        let batch_id = BatchId::new();

        contract.commit_batch(batch_id, BlobTransactionSidecar::default()).await?;
        let err = contract.commit_batch(batch_id, BlobTransactionSidecar::default()).await;

        assert!(err.is_err_and(|err| err.is(ContractError::BatchAlreadyCommitted)));
        assert!(contract.is_batch_committed(batch_id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_state_checks() -> eyre::Result<()> {
        // Given
        let contract = NoopRollupContract::new();
        let genesis = B256::repeat_byte(1);
        contract.set_genesis_state_root(genesis).await?;
        let batch_id = BatchId::new();

        // When the batch is not committed
        let err = contract.update_state(request(batch_id, genesis, B256::repeat_byte(2))).await;
        assert!(err.is_err_and(|err| err.is(ContractError::BatchNotCommitted)));

        // When the old state root is wrong
        contract.commit_batch(batch_id, BlobTransactionSidecar::default()).await?;
        let wrong_root = request(batch_id, B256::repeat_byte(9), B256::repeat_byte(2));
        let err = contract.update_state(wrong_root).await;
        assert!(matches!(
            err,
            Err(L1Error::OldStateRootMismatch { expected, .. }) if expected == genesis
        ));

        // When the request is valid
        contract.update_state(request(batch_id, genesis, B256::repeat_byte(2))).await?;
        assert!(contract.is_batch_finalized(batch_id).await?);
        assert_eq!(contract.latest_finalized_state_root().await?, B256::repeat_byte(2));

        // Then the batch cannot be finalized again
        let again = request(batch_id, B256::repeat_byte(2), B256::repeat_byte(3));
        let err = contract.update_state(again).await;
        assert!(err.is_err_and(|err| err.is(ContractError::BatchAlreadyFinalized)));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_state_validates_locally() {
        let contract = NoopRollupContract::new();
        let mut req = request(BatchId::new(), B256::ZERO, B256::repeat_byte(2));
        let err = contract.update_state(req.clone()).await;
        assert!(matches!(err, Err(L1Error::EmptyOldStateRoot)));

        req.old_state_root = B256::repeat_byte(1);
        req.validity_proof = Bytes::new();
        let err = contract.update_state(req.clone()).await;
        assert!(matches!(err, Err(L1Error::EmptyValidityProof)));

        req.data_proofs = DataProofs::default();
        assert!(matches!(contract.update_state(req).await, Err(L1Error::EmptyDataProofs)));
    }

    #[tokio::test]
    async fn test_rollback_state() -> eyre::Result<()> {
        // Given a finalized batch and a committed batch on top of it
        let contract = NoopRollupContract::new();
        let genesis = B256::repeat_byte(1);
        contract.set_genesis_state_root(genesis).await?;
        let (first, second) = (BatchId::new(), BatchId::new());
        contract.commit_batch(first, BlobTransactionSidecar::default()).await?;
        contract.update_state(request(first, genesis, B256::repeat_byte(2))).await?;
        contract.commit_batch(second, BlobTransactionSidecar::default()).await?;

        // When
        contract.rollback_state(genesis).await?;

        // Then
        assert_eq!(contract.latest_finalized_state_root().await?, genesis);
        assert!(!contract.is_batch_finalized(first).await?);
        assert!(!contract.is_batch_committed(second).await?);
        let err = contract.rollback_state(B256::repeat_byte(2)).await;
        assert!(err.is_err_and(|err| err.is(ContractError::InvalidRollbackTarget)));
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_data_proofs() -> eyre::Result<()> {
        // Given
        let contract = NoopRollupContract::new();
        let (hash, proof) = kzg_proof(7)?;
        let (other_hash, other_proof) = kzg_proof(8)?;
        let proofs: DataProofs = vec![proof, other_proof].into();

        // When
        contract.verify_data_proofs(&[hash, other_hash], &proofs).await?;

        // Then
        let err = contract.verify_data_proofs(&[other_hash, hash], &proofs).await;
        assert!(err.is_err_and(|err| err.is(ContractError::InvalidVersionedHash)));
        let err = contract.verify_data_proofs(&[hash], &proofs).await;
        assert!(matches!(err, Err(L1Error::DataProofCountMismatch { proofs: 2, hashes: 1 })));

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_data_proofs_rejects_invalid_opening() -> eyre::Result<()> {
        // Given
        let contract = NoopRollupContract::new();
        let commitment: [u8; 48] = kzg_proof(7)?.1.commitment().try_into()?;
        let (hash, proof) = proof_for(commitment);

        // When
        let err = contract.verify_data_proofs(&[hash], &vec![proof].into()).await;

        // Then
        assert!(err.is_err_and(|err| err.is(ContractError::InvalidDataProofItem)));

        Ok(())
    }

    #[tokio::test]
    async fn test_injected_commit_failure() -> eyre::Result<()> {
        let contract = NoopRollupContract::new();
        contract.fail_next_commit(ContractError::BatchAlreadyCommitted);

        let batch_id = BatchId::new();
        let err = contract.commit_batch(batch_id, BlobTransactionSidecar::default()).await;

        assert!(err.is_err_and(|err| err.is(ContractError::BatchAlreadyCommitted)));
        contract.commit_batch(batch_id, BlobTransactionSidecar::default()).await?;
        Ok(())
    }
}
