use crate::{
    abi::IRollupContract::{self, IRollupContractInstance},
    contract::check_update_state,
    ContractError, L1Error, RollupContract, UpdateStateRequest,
};
use alloy_contract::{CallBuilder, CallDecoder};
use alloy_eips::{eip4844::BlobTransactionSidecar, BlockId};
use alloy_network::ReceiptResponse;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use sync_committee_primitives::{BatchId, DataProofs};

/// The implementation of [`RollupContract`] backed by an alloy [`Provider`] holding the key of the
/// committer.
#[derive(Debug, Clone)]
pub struct RollupContractClient<P> {
    contract: IRollupContractInstance<P>,
}

impl<P: Provider> RollupContractClient<P> {
    /// Returns a new [`RollupContractClient`] for the contract at the provided address.
    pub fn new(address: Address, provider: P) -> Self {
        Self { contract: IRollupContract::new(address, provider) }
    }

    /// Returns the address of the contract.
    pub fn address(&self) -> &Address {
        self.contract.address()
    }

    /// Simulates the call, then sends it and waits for its receipt. If the transaction fails once
    /// included, the call is simulated again against the block of the failure to recover the
    /// revert reason.
    async fn simulate_and_send<D>(
        &self,
        method: &'static str,
        call: CallBuilder<&P, D>,
    ) -> Result<(), L1Error>
    where
        D: CallDecoder + Clone + Send + Sync + Unpin,
    {
        if let Err(err) = call.call().await {
            let err = L1Error::from(err);
            tracing::debug!(target: "sync_committee::l1", method, %err, "simulation failed");
            return Err(err);
        }

        let receipt = call.send().await?.get_receipt().await?;
        let tx_hash = receipt.transaction_hash();
        if receipt.status() {
            tracing::info!(
                target: "sync_committee::l1",
                method,
                %tx_hash,
                block = ?receipt.block_number(),
                "transaction included"
            );
            return Ok(());
        }

        let reason = match receipt.block_number() {
            Some(number) => call
                .clone()
                .block(BlockId::number(number))
                .call()
                .await
                .err()
                .and_then(|err| err.as_revert_data())
                .and_then(|data| ContractError::decode(&data)),
            None => None,
        };
        tracing::warn!(
            target: "sync_committee::l1",
            method,
            %tx_hash,
            ?reason,
            "transaction failed"
        );
        Err(L1Error::TransactionFailed { tx_hash, reason })
    }
}

#[async_trait::async_trait]
impl<P: Provider> RollupContract for RollupContractClient<P> {
    async fn set_genesis_state_root(&self, state_root: B256) -> Result<(), L1Error> {
        if state_root.is_zero() {
            return Err(L1Error::EmptyNewStateRoot);
        }
        let call = self.contract.setGenesisStateRoot(state_root);
        self.simulate_and_send("setGenesisStateRoot", call).await
    }

    async fn update_state(&self, request: UpdateStateRequest) -> Result<(), L1Error> {
        check_update_state(self, &request).await?;

        let call = self.contract.updateState(
            request.batch_id.to_string(),
            request.old_state_root,
            request.new_state_root,
            request.data_proofs.to_bytes_vec(),
            request.validity_proof,
            IRollupContract::PublicDataInfo {
                l2Tol1Root: request.public_data.l2_to_l1_root,
                messageCount: request.public_data.message_count,
            },
        );
        self.simulate_and_send("updateState", call).await
    }

    async fn latest_finalized_state_root(&self) -> Result<B256, L1Error> {
        let index = self.contract.getLastFinalizedBatchIndex().call().await?;
        Ok(self.contract.finalizedStateRoots(index).call().await?)
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
            self.contract.verifyDataProof(*hash, proof.to_bytes()).call().await?;
        }
        Ok(())
    }

    async fn commit_batch(
        &self,
        batch_id: BatchId,
        sidecar: BlobTransactionSidecar,
    ) -> Result<(), L1Error> {
        let blob_count = U256::from(sidecar.blobs.len());
        let call = self.contract.commitBatch(batch_id.to_string(), blob_count).sidecar(sidecar);
        self.simulate_and_send("commitBatch", call).await
    }

    async fn rollback_state(&self, target_state_root: B256) -> Result<(), L1Error> {
        self.simulate_and_send("resetState", self.contract.resetState(target_state_root)).await
    }

    async fn is_batch_committed(&self, batch_id: BatchId) -> Result<bool, L1Error> {
        Ok(self.contract.isBatchCommitted(batch_id.to_string()).call().await?)
    }

    async fn is_batch_finalized(&self, batch_id: BatchId) -> Result<bool, L1Error> {
        Ok(self.contract.isBatchFinalized(batch_id.to_string()).call().await?)
    }
}
