use crate::{metrics::SyncerMetrics, ResetLauncher, Resetter, SyncError, SyncFailure};
use alloy_primitives::B256;
use std::time::Duration;
use sync_committee_db::BatchStorage;
use sync_committee_fetcher::{BlockFetcher, L2Client};
use sync_committee_l1::RollupContract;
use sync_committee_primitives::MAIN_SHARD_ID;
use sync_committee_tasks::PeriodicTask;

/// The default interval between two synchronizations of the state root.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// The configuration of the [`StateRootSyncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncerConfig {
    /// The interval between two synchronizations.
    pub poll_interval: Duration,
    /// Whether an initialized local state root is checked against L2 and L1.
    pub check_if_in_sync: bool,
    /// Whether the local state root is resynchronized on every run.
    pub always_sync: bool,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self { poll_interval: DEFAULT_SYNC_INTERVAL, check_if_in_sync: true, always_sync: false }
    }
}

/// The action required to bring the local state root in line with L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// The local state root is in sync.
    InSync(B256),
    /// The local state root was never set.
    Initialize,
    /// The local state root diverged and the progress must be reset.
    Resync,
}

/// The outcome of a synchronization, carrying the local state root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The local state root was already in sync.
    InSync(B256),
    /// The local state root was set for the first time.
    Initialized(B256),
    /// The progress was reset and the local state root replaced.
    Resynced(B256),
}

impl SyncOutcome {
    /// Returns the local state root after the synchronization.
    pub const fn state_root(&self) -> B256 {
        match self {
            Self::InSync(root) | Self::Initialized(root) | Self::Resynced(root) => *root,
        }
    }
}

/// Keeps the locally proved state root in line with the state root finalized on L1.
///
/// The state root of the sync committee is the hash of a main shard block. When L1 holds no
/// finalized state root, or holds one unknown to the main shard, the genesis block of the main
/// shard is used.
#[derive(Debug)]
pub struct StateRootSyncer<C, S, L> {
    fetcher: BlockFetcher<C>,
    storage: S,
    l1: L,
    resetter: Resetter<S>,
    config: SyncerConfig,
    metrics: SyncerMetrics,
}

impl<C, S, L> StateRootSyncer<C, S, L>
where
    C: L2Client,
    S: BatchStorage + Clone,
    L: RollupContract,
{
    /// Returns a new [`StateRootSyncer`].
    pub fn new(fetcher: BlockFetcher<C>, storage: S, l1: L, config: SyncerConfig) -> Self {
        let resetter = Resetter::new(storage.clone());
        Self { fetcher, storage, l1, resetter, config, metrics: SyncerMetrics::default() }
    }
}

impl<C, S, L> StateRootSyncer<C, S, L>
where
    C: L2Client,
    S: BatchStorage,
    L: RollupContract,
{
    /// Returns the configuration of the syncer.
    pub const fn config(&self) -> &SyncerConfig {
        &self.config
    }

    /// Returns the resetter of the progress.
    pub const fn resetter(&self) -> &Resetter<S> {
        &self.resetter
    }

    /// Brings the local state root in line with L1.
    ///
    /// An unset local state root is initialized. An initialized one is resynchronized when the
    /// syncer always syncs, or when it checks the root and finds it either unknown to the main
    /// shard or different from the state root finalized on L1.
    #[tracing::instrument(target = "sync_committee::syncer", skip_all)]
    pub async fn sync_latest_finalized_root(&self) -> Result<SyncOutcome, SyncError> {
        match self.next_action().await? {
            SyncAction::InSync(root) => Ok(SyncOutcome::InSync(root)),
            SyncAction::Initialize => self.initialize().await.map(SyncOutcome::Initialized),
            SyncAction::Resync => self.resync().await.map(SyncOutcome::Resynced),
        }
    }

    /// Returns the action required to bring the local state root in line with L1.
    pub async fn next_action(&self) -> Result<SyncAction, SyncError> {
        self.wrap(self.next_action_inner()).await
    }

    /// Sets the local state root to the one resolved from L1.
    pub async fn initialize(&self) -> Result<B256, SyncError> {
        let root = self.wrap(self.initialize_inner()).await?;
        self.metrics.initializations.increment(1);
        tracing::info!(target: "sync_committee::syncer", %root, "initialized local state root");
        Ok(root)
    }

    /// Discards the progress which is not proved and sets the local state root to the one
    /// resolved from L1.
    pub async fn resync(&self) -> Result<B256, SyncError> {
        let root = self.wrap(self.resync_inner()).await?;
        self.metrics.resyncs.increment(1);
        tracing::info!(target: "sync_committee::syncer", %root, "resynchronized local state root");
        Ok(root)
    }

    async fn wrap<T>(
        &self,
        fut: impl core::future::Future<Output = Result<T, SyncFailure>>,
    ) -> Result<T, SyncError> {
        fut.await.map_err(|err| {
            self.metrics.failures.increment(1);
            tracing::warn!(target: "sync_committee::syncer", %err, "state root not synced");
            SyncError::StateRootNotSynced(err)
        })
    }

    async fn next_action_inner(&self) -> Result<SyncAction, SyncFailure> {
        let Some(root) = self.storage.get_proved_state_root().await? else {
            return Ok(SyncAction::Initialize);
        };
        if self.config.always_sync {
            return Ok(SyncAction::Resync);
        }
        if self.config.check_if_in_sync && !self.is_in_sync(root).await? {
            return Ok(SyncAction::Resync);
        }
        Ok(SyncAction::InSync(root))
    }

    async fn initialize_inner(&self) -> Result<B256, SyncFailure> {
        let root = self.resolve_root().await?;
        self.storage.set_proved_state_root(root).await?;
        Ok(root)
    }

    async fn resync_inner(&self) -> Result<B256, SyncFailure> {
        let root = self.resolve_root().await?;
        self.resetter.reset_progress_full().await?;
        self.storage.set_proved_state_root(root).await?;
        Ok(root)
    }

    /// A local state root is in sync if it exists on the main shard and matches the root
    /// resolved from L1. Without a finalized state root on L1 only the first condition applies.
    async fn is_in_sync(&self, root: B256) -> Result<bool, SyncFailure> {
        if self.fetcher.try_get_block_ref(MAIN_SHARD_ID, root).await?.is_none() {
            tracing::warn!(target: "sync_committee::syncer", %root, "local state root not on L2");
            return Ok(false);
        }
        let finalized = self.l1.latest_finalized_state_root().await?;
        if finalized.is_zero() {
            return Ok(true);
        }
        let resolved = self.resolve_finalized(finalized).await?;
        if resolved != root {
            tracing::warn!(
                target: "sync_committee::syncer",
                local = %root,
                %resolved,
                "local state root differs from L1"
            );
            return Ok(false);
        }
        Ok(true)
    }

    async fn resolve_root(&self) -> Result<B256, SyncFailure> {
        let finalized = self.l1.latest_finalized_state_root().await?;
        if finalized.is_zero() {
            return Ok(self.fetcher.genesis_block_ref(MAIN_SHARD_ID).await?.hash);
        }
        self.resolve_finalized(finalized).await
    }

    /// Returns the finalized state root if the main shard holds it, the genesis block otherwise.
    async fn resolve_finalized(&self, finalized: B256) -> Result<B256, SyncFailure> {
        if self.fetcher.try_get_block_ref(MAIN_SHARD_ID, finalized).await?.is_some() {
            return Ok(finalized);
        }
        tracing::warn!(
            target: "sync_committee::syncer",
            %finalized,
            "finalized state root not on L2, falling back to genesis"
        );
        Ok(self.fetcher.genesis_block_ref(MAIN_SHARD_ID).await?.hash)
    }
}

/// The [`PeriodicTask`] running the [`StateRootSyncer`]. A resynchronization pauses the
/// aggregator through the [`ResetLauncher`].
#[derive(Debug)]
pub struct StateRootSyncTask<C, S, L> {
    launcher: ResetLauncher<C, S, L>,
}

impl<C, S, L> StateRootSyncTask<C, S, L> {
    /// Returns a new [`StateRootSyncTask`].
    pub const fn new(launcher: ResetLauncher<C, S, L>) -> Self {
        Self { launcher }
    }
}

#[async_trait::async_trait]
impl<C, S, L> PeriodicTask for StateRootSyncTask<C, S, L>
where
    C: L2Client + 'static,
    S: BatchStorage + 'static,
    L: RollupContract + 'static,
{
    fn name(&self) -> &str {
        "state_root_syncer"
    }

    fn interval(&self) -> Duration {
        self.launcher.syncer().config().poll_interval
    }

    async fn tick(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let syncer = self.launcher.syncer();
        match syncer.next_action().await? {
            SyncAction::InSync(root) => {
                tracing::trace!(target: "sync_committee::syncer", %root, "state root in sync");
            }
            SyncAction::Initialize => {
                syncer.initialize().await?;
            }
            SyncAction::Resync => {
                self.launcher.reset_to_l1().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sync_committee_db::InMemoryDatabase;
    use sync_committee_fetcher::test_utils::MockL2Client;
    use sync_committee_l1::NoopRollupContract;

    type TestSyncer =
        StateRootSyncer<Arc<MockL2Client>, Arc<InMemoryDatabase>, Arc<NoopRollupContract>>;

    fn syncer(config: SyncerConfig) -> (Arc<MockL2Client>, Arc<NoopRollupContract>, TestSyncer) {
        let l2 = Arc::new(MockL2Client::new([1]));
        let l1 = Arc::new(NoopRollupContract::new());
        let storage = Arc::new(InMemoryDatabase::default());
        let fetcher = BlockFetcher::new(l2.clone());
        let syncer = StateRootSyncer::new(fetcher, storage, l1.clone(), config);
        (l2, l1, syncer)
    }

    #[tokio::test]
    async fn test_initialize_falls_back_to_genesis() -> eyre::Result<()> {
        // Given
        let (l2, _, syncer) = syncer(SyncerConfig::default());
        let genesis = l2.genesis(MAIN_SHARD_ID).expect("genesis").hash;

        // When
        let outcome = syncer.sync_latest_finalized_root().await?;

        // Then
        assert_eq!(outcome, SyncOutcome::Initialized(genesis));
        assert_eq!(syncer.storage.get_proved_state_root().await?, Some(genesis));

        // When
        let outcome = syncer.sync_latest_finalized_root().await?;

        // Then
        assert_eq!(outcome, SyncOutcome::InSync(genesis));

        Ok(())
    }

    #[tokio::test]
    async fn test_initialize_adopts_finalized_root_known_to_l2() -> eyre::Result<()> {
        // Given
        let (l2, l1, syncer) = syncer(SyncerConfig::default());
        let block = l2.produce_main_blocks(3).remove(1);
        l1.set_genesis_state_root(block.hash).await?;

        // When
        let outcome = syncer.sync_latest_finalized_root().await?;

        // Then
        assert_eq!(outcome, SyncOutcome::Initialized(block.hash));

        Ok(())
    }

    #[tokio::test]
    async fn test_initialize_ignores_finalized_root_unknown_to_l2() -> eyre::Result<()> {
        // Given
        let (l2, l1, syncer) = syncer(SyncerConfig::default());
        l1.set_genesis_state_root(B256::repeat_byte(7)).await?;
        let genesis = l2.genesis(MAIN_SHARD_ID).expect("genesis").hash;

        // When
        let outcome = syncer.sync_latest_finalized_root().await?;

        // Then
        assert_eq!(outcome, SyncOutcome::Initialized(genesis));

        // When
        let batch = sync_committee_primitives::BlockBatch::new(None, std::time::SystemTime::now());
        syncer.storage.put_batch(&batch).await?;
        let outcomes = [
            syncer.sync_latest_finalized_root().await?,
            syncer.sync_latest_finalized_root().await?,
        ];

        // Then
        assert_eq!(outcomes, [SyncOutcome::InSync(genesis); 2]);
        assert_eq!(syncer.storage.get_latest_batch().await?, Some(batch));

        Ok(())
    }

    #[tokio::test]
    async fn test_resync_when_local_root_left_l2() -> eyre::Result<()> {
        // Given
        let (l2, _, syncer) = syncer(SyncerConfig::default());
        let block = l2.produce_main_blocks(2).remove(1);
        syncer.storage.set_proved_state_root(block.hash).await?;
        l2.truncate(MAIN_SHARD_ID, 1);

        // When
        let outcome = syncer.sync_latest_finalized_root().await?;

        // Then
        let genesis = l2.genesis(MAIN_SHARD_ID).expect("genesis").hash;
        assert_eq!(outcome, SyncOutcome::Resynced(genesis));

        Ok(())
    }

    #[tokio::test]
    async fn test_unchecked_root_is_kept() -> eyre::Result<()> {
        let config = SyncerConfig { check_if_in_sync: false, ..Default::default() };
        let (_, _, syncer) = syncer(config);
        let root = B256::repeat_byte(1);
        syncer.storage.set_proved_state_root(root).await?;

        assert_eq!(syncer.sync_latest_finalized_root().await?, SyncOutcome::InSync(root));
        Ok(())
    }

    #[tokio::test]
    async fn test_always_sync_resyncs_every_run() -> eyre::Result<()> {
        let config = SyncerConfig { always_sync: true, ..Default::default() };
        let (l2, _, syncer) = syncer(config);
        let genesis = l2.genesis(MAIN_SHARD_ID).expect("genesis").hash;
        syncer.storage.set_proved_state_root(genesis).await?;

        assert_eq!(syncer.sync_latest_finalized_root().await?, SyncOutcome::Resynced(genesis));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_local_root_requires_resync() -> eyre::Result<()> {
        // Given
        let (_, _, syncer) = syncer(SyncerConfig::default());
        let missing = B256::repeat_byte(3);
        syncer.storage.set_proved_state_root(missing).await?;

        // When
        let action = syncer.next_action().await?;

        // Then
        assert_eq!(action, SyncAction::Resync);

        Ok(())
    }
}
