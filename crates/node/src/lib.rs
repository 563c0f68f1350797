//! The sync committee node: wires the block fetcher, the storage, the committer, the state root
//! syncer and the aggregator together and runs them as supervised background workers.

pub use args::{BatchArgs, L1Args, StorageArgs, SyncCommitteeArgs, SyncerArgs};
mod args;

pub use config::{L1Config, SyncCommitteeConfig};
mod config;

use alloy_network::EthereumWallet;
use alloy_provider::ProviderBuilder;
use std::sync::Arc;
use sync_committee_aggregator::{Aggregator, ResetLauncher, StateRootSyncTask, StateRootSyncer};
use sync_committee_committer::{CKzgBackend, Committer};
use sync_committee_db::InMemoryDatabase;
use sync_committee_fetcher::{BlockFetcher, L2Client};
use sync_committee_l1::{NoopRollupContract, RollupContract, RollupContractClient};
use sync_committee_tasks::{PauseController, PeriodicWorker, Supervisor, SupervisorHandle};
use tokio_util::sync::CancellationToken;

/// The storage shared by the components of the node.
pub type Storage = Arc<InMemoryDatabase>;

/// The rollup contract shared by the components of the node.
pub type Contract = Arc<dyn RollupContract>;

/// The sync committee node for the L2 reached through `C`.
pub struct SyncCommittee<C> {
    storage: Storage,
    syncer: Arc<StateRootSyncer<C, Storage, Contract>>,
    aggregator: Arc<Aggregator<C, Storage, Contract, CKzgBackend>>,
    launcher: ResetLauncher<C, Storage, Contract>,
}

impl<C> core::fmt::Debug for SyncCommittee<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncCommittee").field("storage", &self.storage).finish_non_exhaustive()
    }
}

impl<C: L2Client + Clone + 'static> SyncCommittee<C> {
    /// Builds the node. Connects to the rollup contract when an L1 connection is configured.
    pub fn new(mut config: SyncCommitteeConfig, l2: C) -> eyre::Result<Self> {
        let l1 = match config.l1.take() {
            Some(l1) => {
                tracing::info!(
                    target: "sync_committee::node",
                    url = %l1.url,
                    contract = %l1.contract_address,
                    committer = %l1.signer.address(),
                    "connecting to the rollup contract"
                );
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(l1.signer))
                    .connect_http(l1.url.parse()?);
                Arc::new(RollupContractClient::new(l1.contract_address, provider)) as Contract
            }
            None => {
                tracing::warn!(
                    target: "sync_committee::node",
                    "no L1 connection configured, simulating the rollup contract"
                );
                Arc::new(NoopRollupContract::new()) as Contract
            }
        };
        Ok(Self::with_contract(config, l2, l1))
    }

    /// Builds the node on top of the provided rollup contract. The L1 connection of the
    /// configuration is ignored.
    pub fn with_contract(config: SyncCommitteeConfig, l2: C, l1: Contract) -> Self {
        let storage = Arc::new(InMemoryDatabase::new(config.storage));
        let fetcher = BlockFetcher::new(l2);

        let syncer = Arc::new(StateRootSyncer::new(
            fetcher.clone(),
            storage.clone(),
            l1.clone(),
            config.syncer,
        ));
        let launcher = ResetLauncher::new(syncer.clone(), PauseController::new());
        let committer = Committer::new(l1, CKzgBackend::new(), config.committer());
        let aggregator = Arc::new(Aggregator::new(
            fetcher,
            storage.clone(),
            committer,
            launcher.clone(),
            config.aggregator,
        ));

        Self { storage, syncer, aggregator, launcher }
    }

    /// Returns the storage of the node.
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the state root syncer.
    pub const fn syncer(&self) -> &Arc<StateRootSyncer<C, Storage, Contract>> {
        &self.syncer
    }

    /// Synchronizes the local state root once, then starts the aggregator and the state root
    /// syncer as background workers cancelled along with `cancel`. A failed initial
    /// synchronization is retried by the syncer worker.
    pub async fn start(&self, cancel: &CancellationToken) -> eyre::Result<SupervisorHandle> {
        match self.syncer.sync_latest_finalized_root().await {
            Ok(outcome) => tracing::info!(
                target: "sync_committee::node",
                root = %outcome.state_root(),
                ?outcome,
                "synchronized state root"
            ),
            Err(err) => {
                tracing::warn!(target: "sync_committee::node", %err, "failed to sync state root")
            }
        }

        let mut supervisor = Supervisor::with_cancellation(cancel);
        supervisor
            .add_worker(
                PeriodicWorker::new(self.aggregator.clone())
                    .with_pause_controller(self.launcher.pause_controller().clone()),
            )
            .add_worker(PeriodicWorker::new(StateRootSyncTask::new(self.launcher.clone())));

        let handle = supervisor.start().await?;
        tracing::info!(target: "sync_committee::node", "sync committee started");
        Ok(handle)
    }
}

/// Installs the global tracing subscriber, logging to the console. The filter is read from
/// `RUST_LOG` and defaults to `info`.
pub fn init_tracing() -> eyre::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_ansi(true),
        )
        .with(filter)
        .try_init()?;
    Ok(())
}
