use crate::{
    metrics::AggregatorMetrics, AggregatorError, BatchConstraintChecker, BatchConstraints,
    ConstraintCheckResult, ResetLauncher,
};
use alloy_primitives::BlockNumber;
use futures::{pin_mut, TryStreamExt};
use std::time::{Duration, Instant, SystemTime};
use sync_committee_committer::{Committer, KzgBackend};
use sync_committee_db::BatchStorage;
use sync_committee_fetcher::{BlockFetcher, L2Client};
use sync_committee_l1::RollupContract;
use sync_committee_primitives::{BlockBatch, BlockRef, BlockRefs, ProofTask, MAIN_SHARD_ID};
use sync_committee_tasks::PeriodicTask;

/// The default interval between two iterations of the aggregator.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The configuration of the [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// The interval between two iterations.
    pub poll_interval: Duration,
    /// The limits applied to the open batch.
    pub constraints: BatchConstraints,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { poll_interval: DEFAULT_POLL_INTERVAL, constraints: BatchConstraints::default() }
    }
}

/// The open batch after fetching new blocks into it.
#[derive(Debug)]
struct Extension {
    batch: BlockBatch,
    added: usize,
    seal: bool,
}

/// Packs the blocks of the L2 shards into batches and commits them to L1.
///
/// Every iteration resumes the latest open batch, or opens a new one, and extends it with the
/// main shard blocks following the latest fetched one along with the blocks of the execution
/// shards they reference. A batch reaching its limits is sealed, committed and handed over to the
/// proof pipeline. The aggregator is driven as a [`PeriodicTask`].
#[derive(Debug)]
pub struct Aggregator<C, S, L, K> {
    fetcher: BlockFetcher<C>,
    storage: S,
    committer: Committer<L, K>,
    checker: BatchConstraintChecker,
    reset: ResetLauncher<C, S, L>,
    config: AggregatorConfig,
    metrics: AggregatorMetrics,
}

impl<C, S, L, K> Aggregator<C, S, L, K>
where
    C: L2Client + 'static,
    S: BatchStorage + 'static,
    L: RollupContract + 'static,
    K: KzgBackend,
{
    /// Returns a new [`Aggregator`].
    pub fn new(
        fetcher: BlockFetcher<C>,
        storage: S,
        committer: Committer<L, K>,
        reset: ResetLauncher<C, S, L>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            fetcher,
            storage,
            committer,
            checker: BatchConstraintChecker::new(config.constraints),
            reset,
            config,
            metrics: AggregatorMetrics::default(),
        }
    }

    /// Returns the configuration of the aggregator.
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Returns the launcher of the resets to L1.
    pub const fn reset_launcher(&self) -> &ResetLauncher<C, S, L> {
        &self.reset
    }

    /// Runs a single iteration: prepares the open batch, extends it with the new blocks, then
    /// either persists or seals and commits it.
    #[tracing::instrument(target = "sync_committee::aggregator", skip_all)]
    pub async fn run_iteration(&self) -> Result<(), AggregatorError> {
        let now = SystemTime::now();
        let batch = self.prepare_batch(now).await?;
        let (start, fetched) = self.fetch_start().await?;
        let extension = self.extend_batch(batch, start, fetched, now).await?;

        self.metrics.fetched_main_blocks.increment(extension.added as u64);
        if extension.seal {
            self.seal_and_commit(extension.batch, now).await?;
            self.metrics.open_batch_blocks.set(0.0);
        } else {
            if extension.added > 0 {
                self.storage.put_batch(&extension.batch).await?;
                tracing::debug!(
                    target: "sync_committee::aggregator",
                    batch_id = %extension.batch.id(),
                    added = extension.added,
                    main_blocks = extension.batch.main_blocks_count(),
                    "extended batch"
                );
            }
            self.metrics.open_batch_blocks.set(extension.batch.main_blocks_count() as f64);
        }
        Ok(())
    }

    /// Returns the batch to extend: the latest batch if it is open and can receive blocks, a new
    /// batch otherwise. An open batch reaching its limits is sealed first, one exceeding them is
    /// discarded along with the progress it holds. A new batch is persisted right away.
    async fn prepare_batch(&self, now: SystemTime) -> Result<BlockBatch, AggregatorError> {
        let parent_id = match self.storage.get_latest_batch().await? {
            Some(batch) if !batch.is_sealed() => match self.checker.check(&batch, now) {
                ConstraintCheckResult::CanBeExtended => return Ok(batch),
                ConstraintCheckResult::ShouldBeSealed => {
                    Some(self.seal_and_commit(batch, now).await?.id())
                }
                ConstraintCheckResult::ShouldBeDiscarded => {
                    tracing::warn!(
                        target: "sync_committee::aggregator",
                        batch_id = %batch.id(),
                        "open batch exceeds its limits, discarding"
                    );
                    self.metrics.discarded_batches.increment(1);
                    self.reset.syncer().resetter().reset_progress_partial(batch.id()).await?;
                    batch.parent_id()
                }
            },
            Some(batch) => Some(batch.id()),
            None => None,
        };

        let batch = BlockBatch::new(parent_id, now);
        self.storage.put_batch(&batch).await?;
        tracing::debug!(
            target: "sync_committee::aggregator",
            batch_id = %batch.id(),
            parent_id = ?parent_id,
            "opened batch"
        );
        Ok(batch)
    }

    /// Returns the main shard block the next fetch follows, along with the latest fetched
    /// block of every shard. The latest fetched main block must still be on the main shard.
    /// Without any fetched block, the block of the proved state root is used.
    async fn fetch_start(&self) -> Result<(BlockRef, BlockRefs), AggregatorError> {
        let fetched = self.storage.get_latest_fetched().await?;
        if let Some(latest) = fetched.main_shard().copied() {
            return match self.fetcher.try_get_block_ref(MAIN_SHARD_ID, latest.hash).await? {
                Some(block) if block.number == latest.number => Ok((block, fetched)),
                _ => Err(AggregatorError::BlockMismatch {
                    number: latest.number,
                    hash: latest.hash,
                }),
            };
        }

        let root = self
            .storage
            .get_proved_state_root()
            .await?
            .ok_or(AggregatorError::LocalStateRootNotInitialized)?;
        let block = self
            .fetcher
            .try_get_block_ref(MAIN_SHARD_ID, root)
            .await?
            .ok_or(AggregatorError::ProvedBlockNotFound(root))?;
        Ok((block, fetched))
    }

    /// Extends the batch with the main shard blocks following `start`, up to the latest main
    /// block and without exceeding the block count limit. Stops at the first block sealing the
    /// batch. A block which would make the batch exceed its limits is left for the next batch,
    /// and the batch is sealed without it.
    async fn extend_batch(
        &self,
        mut batch: BlockBatch,
        start: BlockRef,
        mut fetched: BlockRefs,
        now: SystemTime,
    ) -> Result<Extension, AggregatorError> {
        let remaining = self
            .config
            .constraints
            .max_blocks_count
            .saturating_sub(batch.main_blocks_count()) as BlockNumber;
        let latest = self.fetcher.latest_block_ref(MAIN_SHARD_ID).await?;
        let from = start.number + 1;

        let (mut added, mut seal) = (0, false);
        if remaining > 0 && latest.number >= from {
            let to = latest.number.min(from + remaining - 1);
            tracing::trace!(target: "sync_committee::aggregator", from, to, "fetching main blocks");

            let mut parent = start;
            let blocks = self.fetcher.fetch_blocks(MAIN_SHARD_ID, from..=to);
            pin_mut!(blocks);
            while let Some(block) = blocks.try_next().await? {
                if !parent.is_parent_of(&block) {
                    return Err(AggregatorError::BlockMismatch {
                        number: parent.number,
                        hash: parent.hash,
                    });
                }

                let segments = self.fetcher.fetch_subgraph(&block, &fetched).await?;
                let candidate = batch.with_added_blocks(&segments, now)?;
                let result = self.checker.check(&candidate, now);
                if result == ConstraintCheckResult::ShouldBeDiscarded {
                    if batch.is_empty() {
                        return Err(AggregatorError::SubgraphTooLarge(block.number));
                    }
                    tracing::debug!(
                        target: "sync_committee::aggregator",
                        main = block.number,
                        "block does not fit into the batch, sealing"
                    );
                    seal = true;
                    break;
                }

                self.metrics.fetched_blocks.increment(segments.blocks_count() as u64);
                fetched.merge(segments.latest_refs());
                parent = block.block_ref();
                batch = candidate;
                added += 1;
                if result == ConstraintCheckResult::ShouldBeSealed {
                    seal = true;
                    break;
                }
            }
        }

        if !seal {
            seal = self.checker.check(&batch, now) == ConstraintCheckResult::ShouldBeSealed;
        }
        Ok(Extension { batch, added, seal })
    }

    /// Seals and commits the batch, then persists it along with its proof task. A sealed batch
    /// is never stored without its task.
    async fn seal_and_commit(
        &self,
        batch: BlockBatch,
        now: SystemTime,
    ) -> Result<BlockBatch, AggregatorError> {
        let sealed = self.committer.commit(batch, now).await?;
        let task = ProofTask::for_batch(&sealed, now)?;
        self.storage.put_sealed_batch(&sealed, task).await?;

        self.metrics.sealed_batches.increment(1);
        self.metrics.proof_tasks.increment(1);
        tracing::info!(
            target: "sync_committee::aggregator",
            batch_id = %sealed.id(),
            main_blocks = sealed.main_blocks_count(),
            blocks = sealed.blocks_count(),
            "sealed batch"
        );
        Ok(sealed)
    }
}

#[async_trait::async_trait]
impl<C, S, L, K> PeriodicTask for Aggregator<C, S, L, K>
where
    C: L2Client + 'static,
    S: BatchStorage + 'static,
    L: RollupContract + 'static,
    K: KzgBackend,
{
    fn name(&self) -> &str {
        "aggregator"
    }

    fn interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Runs an iteration. An iteration revealing a divergence from L2 or L1 launches a reset to
    /// L1, which pauses the aggregator until it completes. Iterations are skipped until the
    /// local state root is initialized, and while the storage is full.
    async fn tick(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let start = Instant::now();
        let result = self.run_iteration().await;
        self.metrics.iteration_duration.record(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_initialized() || err.is_capacity_limit() => {
                self.metrics.skipped_iterations.increment(1);
                tracing::debug!(target: "sync_committee::aggregator", %err, "skipping iteration");
                Ok(())
            }
            Err(err) if err.requires_l1_reset() => {
                self.metrics.l1_resets_requested.increment(1);
                tracing::warn!(
                    target: "sync_committee::aggregator",
                    %err,
                    "local progress diverged, resetting to L1"
                );
                self.reset.launch_reset_to_l1();
                Ok(())
            }
            Err(err) => {
                self.metrics.iteration_errors.increment(1);
                Err(err.into())
            }
        }
    }
}
