use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use sync_committee_aggregator::{AggregatorConfig, SyncerConfig};
use sync_committee_committer::CommitterConfig;
use sync_committee_db::StorageConfig;

/// The configuration of a [`SyncCommittee`](crate::SyncCommittee).
#[derive(Debug, Clone, Default)]
pub struct SyncCommitteeConfig {
    /// The connection to the rollup contract. The contract is simulated in memory when absent.
    pub l1: Option<L1Config>,
    /// The configuration of the aggregator.
    pub aggregator: AggregatorConfig,
    /// The configuration of the state root syncer.
    pub syncer: SyncerConfig,
    /// The configuration of the storage.
    pub storage: StorageConfig,
}

impl SyncCommitteeConfig {
    /// Returns the configuration of the committer. A commit transaction carries every blob of a
    /// batch, so its blob limit is the one applied to the batches.
    pub const fn committer(&self) -> CommitterConfig {
        CommitterConfig { max_blobs_in_tx: self.aggregator.constraints.max_blobs }
    }
}

/// The connection to the rollup contract deployed on L1.
#[derive(Debug, Clone)]
pub struct L1Config {
    /// The URL of the L1 RPC.
    pub url: String,
    /// The address of the rollup contract.
    pub contract_address: Address,
    /// The signer of the commit transactions.
    pub signer: PrivateKeySigner,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committer_follows_batch_blob_limit() {
        let mut config = SyncCommitteeConfig::default();
        assert_eq!(config.committer(), CommitterConfig::default());

        config.aggregator.constraints.max_blobs = 3;

        assert_eq!(config.committer().max_blobs_in_tx, 3);
    }
}
