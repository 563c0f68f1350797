use crate::L1Error;
use alloy_eips::eip4844::BlobTransactionSidecar;
use alloy_primitives::{Bytes, B256, U256};
use sync_committee_primitives::{BatchId, DataProofs};

/// The public data committed along a state update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicDataInfo {
    /// The root of the L2 to L1 messages tree.
    pub l2_to_l1_root: B256,
    /// The number of L2 to L1 messages.
    pub message_count: U256,
}

/// A request to move the finalized state root of the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStateRequest {
    /// The proved batch.
    pub batch_id: BatchId,
    /// The state root the batch applies to. Must be the current finalized state root.
    pub old_state_root: B256,
    /// The state root after the batch.
    pub new_state_root: B256,
    /// The data proofs of the batch.
    pub data_proofs: DataProofs,
    /// The validity proof of the state transition.
    pub validity_proof: Bytes,
    /// The public data of the batch.
    pub public_data: PublicDataInfo,
}

impl UpdateStateRequest {
    /// Checks the request before any call to the contract.
    pub fn validate(&self) -> Result<(), L1Error> {
        if self.old_state_root.is_zero() {
            return Err(L1Error::EmptyOldStateRoot);
        }
        if self.new_state_root.is_zero() {
            return Err(L1Error::EmptyNewStateRoot);
        }
        if self.data_proofs.is_empty() {
            return Err(L1Error::EmptyDataProofs);
        }
        if self.validity_proof.is_empty() {
            return Err(L1Error::EmptyValidityProof);
        }
        Ok(())
    }
}

/// The rollup contract deployed on L1.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Arc, &)]
pub trait RollupContract: Send + Sync {
    /// Sets the state root the rollup starts from. Can only be set once.
    async fn set_genesis_state_root(&self, state_root: B256) -> Result<(), L1Error>;

    /// Moves the finalized state root with a proved batch.
    async fn update_state(&self, request: UpdateStateRequest) -> Result<(), L1Error>;

    /// Returns the latest finalized state root. Zero if no state root was ever set.
    async fn latest_finalized_state_root(&self) -> Result<B256, L1Error>;

    /// Verifies every data proof against the blob with the versioned hash at the same position.
    async fn verify_data_proofs(
        &self,
        versioned_hashes: &[B256],
        data_proofs: &DataProofs,
    ) -> Result<(), L1Error>;

    /// Commits the batch by posting its blobs.
    async fn commit_batch(
        &self,
        batch_id: BatchId,
        sidecar: BlobTransactionSidecar,
    ) -> Result<(), L1Error>;

    /// Rolls the finalized state back to a previously finalized state root.
    async fn rollback_state(&self, target_state_root: B256) -> Result<(), L1Error>;

    /// Returns true if the batch was committed.
    async fn is_batch_committed(&self, batch_id: BatchId) -> Result<bool, L1Error>;

    /// Returns true if the batch was finalized.
    async fn is_batch_finalized(&self, batch_id: BatchId) -> Result<bool, L1Error>;
}

/// Checks the remote preconditions of a state update, shared by the implementations of
/// [`RollupContract`].
pub(crate) async fn check_update_state<C: RollupContract + ?Sized>(
    contract: &C,
    request: &UpdateStateRequest,
) -> Result<(), L1Error> {
    request.validate()?;

    if contract.is_batch_finalized(request.batch_id).await? {
        return Err(crate::ContractError::BatchAlreadyFinalized.into());
    }
    if !contract.is_batch_committed(request.batch_id).await? {
        return Err(crate::ContractError::BatchNotCommitted.into());
    }

    let finalized = contract.latest_finalized_state_root().await?;
    if finalized != request.old_state_root {
        return Err(L1Error::OldStateRootMismatch {
            expected: finalized,
            actual: request.old_state_root,
        });
    }
    Ok(())
}
