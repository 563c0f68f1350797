use crate::config::{L1Config, SyncCommitteeConfig};
use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::ArgAction;
use std::time::Duration;
use sync_committee_aggregator::{
    AggregatorConfig, BatchConstraints, SyncerConfig, DEFAULT_MAX_BLOCKS_COUNT,
    DEFAULT_POLL_INTERVAL, DEFAULT_SEAL_AFTER, DEFAULT_SYNC_INTERVAL,
};
use sync_committee_committer::DEFAULT_MAX_BLOBS_IN_TX;
use sync_committee_db::{StorageConfig, DEFAULT_MAX_BATCHES};

/// The maximum number of blobs a single transaction can carry.
const MAX_BLOBS_PER_TX: usize = 6;

/// The arguments of the sync committee.
#[derive(Debug, Clone, clap::Args)]
pub struct SyncCommitteeArgs {
    /// The L1 arguments.
    #[command(flatten)]
    pub l1_args: L1Args,
    /// The batching arguments.
    #[command(flatten)]
    pub batch_args: BatchArgs,
    /// The state root syncer arguments.
    #[command(flatten)]
    pub syncer_args: SyncerArgs,
    /// The storage arguments.
    #[command(flatten)]
    pub storage_args: StorageArgs,
}

impl SyncCommitteeArgs {
    /// Validates the arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_args.max_blocks_count == 0 {
            return Err("The maximum number of blocks in a batch must be positive".to_string());
        }
        if !(1..=MAX_BLOBS_PER_TX).contains(&self.batch_args.max_blobs) {
            return Err(format!(
                "The maximum number of blobs must be between 1 and {MAX_BLOBS_PER_TX}"
            ));
        }
        if self.storage_args.max_batches == 0 {
            return Err("The storage must hold at least one batch".to_string());
        }
        if self.batch_args.poll_interval_ms == 0 || self.syncer_args.poll_interval_secs == 0 {
            return Err("Poll intervals must be positive".to_string());
        }

        let l1 = &self.l1_args;
        if l1.url.is_some() {
            if l1.contract_address.is_none() {
                return Err("The rollup contract address is required with an L1 URL".to_string());
            }
            if l1.private_key.is_none() {
                return Err("The committer private key is required with an L1 URL".to_string());
            }
        } else if l1.contract_address.is_some() || l1.private_key.is_some() {
            return Err("The L1 contract address and private key require an L1 URL".to_string());
        }

        Ok(())
    }

    /// Validates the arguments and converts them into the configuration of the sync committee.
    pub fn into_config(self) -> eyre::Result<SyncCommitteeConfig> {
        self.validate().map_err(|err| eyre::eyre!(err))?;

        let l1 = match (self.l1_args.url, self.l1_args.contract_address, self.l1_args.private_key) {
            (Some(url), Some(contract_address), Some(private_key)) => {
                let signer = private_key
                    .trim()
                    .parse::<PrivateKeySigner>()
                    .map_err(|err| eyre::eyre!("Invalid committer private key: {err}"))?;
                Some(L1Config { url, contract_address, signer })
            }
            _ => None,
        };

        let batch = self.batch_args;
        let constraints = BatchConstraints {
            max_blocks_count: batch.max_blocks_count,
            seal_after: Duration::from_secs(batch.seal_after_secs),
            max_blobs: batch.max_blobs,
        };

        Ok(SyncCommitteeConfig {
            l1,
            aggregator: AggregatorConfig {
                poll_interval: Duration::from_millis(batch.poll_interval_ms),
                constraints,
            },
            syncer: SyncerConfig {
                poll_interval: Duration::from_secs(self.syncer_args.poll_interval_secs),
                check_if_in_sync: self.syncer_args.check_if_in_sync,
                always_sync: self.syncer_args.always_sync,
            },
            storage: StorageConfig { max_batches: self.storage_args.max_batches },
        })
    }
}

/// The arguments of the L1 connection. Without an L1 URL, the rollup contract is simulated in
/// memory.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct L1Args {
    /// The URL of the L1 RPC.
    #[arg(long = "l1.url", id = "l1_url", value_name = "L1_URL", env = "SYNC_COMMITTEE_L1_URL")]
    pub url: Option<String>,
    /// The address of the rollup contract.
    #[arg(
        long = "l1.contract-address",
        id = "l1_contract_address",
        value_name = "ADDRESS",
        env = "SYNC_COMMITTEE_L1_CONTRACT_ADDRESS"
    )]
    pub contract_address: Option<Address>,
    /// The hex-encoded private key of the committer.
    #[arg(
        long = "l1.private-key",
        id = "l1_private_key",
        value_name = "PRIVATE_KEY",
        env = "SYNC_COMMITTEE_L1_PRIVATE_KEY",
        hide_env_values = true
    )]
    pub private_key: Option<String>,
}

/// The arguments of the batching.
#[derive(Debug, Clone, clap::Args)]
pub struct BatchArgs {
    /// The maximum number of main shard blocks in a batch.
    #[arg(
        long = "batch.max-blocks",
        value_name = "COUNT",
        env = "SYNC_COMMITTEE_BATCH_MAX_BLOCKS",
        default_value_t = DEFAULT_MAX_BLOCKS_COUNT
    )]
    pub max_blocks_count: usize,
    /// The age in seconds after which a non-empty batch is sealed.
    #[arg(
        long = "batch.seal-after",
        value_name = "SECONDS",
        env = "SYNC_COMMITTEE_BATCH_SEAL_AFTER",
        default_value_t = DEFAULT_SEAL_AFTER.as_secs()
    )]
    pub seal_after_secs: u64,
    /// The maximum number of blobs of a batch.
    #[arg(
        long = "batch.max-blobs",
        value_name = "COUNT",
        env = "SYNC_COMMITTEE_BATCH_MAX_BLOBS",
        default_value_t = DEFAULT_MAX_BLOBS_IN_TX
    )]
    pub max_blobs: usize,
    /// The interval in milliseconds between two iterations of the aggregator.
    #[arg(
        long = "batch.poll-interval",
        value_name = "MILLISECONDS",
        env = "SYNC_COMMITTEE_BATCH_POLL_INTERVAL",
        default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64
    )]
    pub poll_interval_ms: u64,
}

impl Default for BatchArgs {
    fn default() -> Self {
        Self {
            max_blocks_count: DEFAULT_MAX_BLOCKS_COUNT,
            seal_after_secs: DEFAULT_SEAL_AFTER.as_secs(),
            max_blobs: DEFAULT_MAX_BLOBS_IN_TX,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// The arguments of the state root syncer.
#[derive(Debug, Clone, clap::Args)]
pub struct SyncerArgs {
    /// The interval in seconds between two synchronizations of the state root.
    #[arg(
        long = "syncer.poll-interval",
        value_name = "SECONDS",
        env = "SYNC_COMMITTEE_SYNCER_POLL_INTERVAL",
        default_value_t = DEFAULT_SYNC_INTERVAL.as_secs()
    )]
    pub poll_interval_secs: u64,
    /// Whether the local state root is checked against L2 and L1.
    #[arg(long = "syncer.check-in-sync", default_value_t = true, action = ArgAction::Set)]
    pub check_if_in_sync: bool,
    /// Whether the local state root is resynchronized on every run.
    #[arg(long = "syncer.always-sync", default_value_t = false)]
    pub always_sync: bool,
}

impl Default for SyncerArgs {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            check_if_in_sync: true,
            always_sync: false,
        }
    }
}

/// The arguments of the storage.
#[derive(Debug, Clone, clap::Args)]
pub struct StorageArgs {
    /// The maximum number of batches held in storage.
    #[arg(
        long = "storage.max-batches",
        value_name = "COUNT",
        env = "SYNC_COMMITTEE_STORAGE_MAX_BATCHES",
        default_value_t = DEFAULT_MAX_BATCHES
    )]
    pub max_batches: usize,
}

impl Default for StorageArgs {
    fn default() -> Self {
        Self { max_batches: DEFAULT_MAX_BATCHES }
    }
}
