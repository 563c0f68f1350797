use crate::{metrics::ResetMetrics, ResetError, StateRootSyncer};
use alloy_primitives::B256;
use parking_lot::Mutex;
use std::sync::Arc;
use sync_committee_db::BatchStorage;
use sync_committee_fetcher::L2Client;
use sync_committee_l1::RollupContract;
use sync_committee_primitives::BatchId;
use sync_committee_tasks::PauseController;
use tokio::task::JoinHandle;

/// Rewinds the progress stored by the aggregator.
#[derive(Debug, Clone)]
pub struct Resetter<S> {
    storage: S,
    metrics: ResetMetrics,
}

impl<S: BatchStorage> Resetter<S> {
    /// Returns a new [`Resetter`] operating on the storage.
    pub fn new(storage: S) -> Self {
        Self { storage, metrics: ResetMetrics::default() }
    }

    /// Discards the failed batch and every batch following it. The pending proof tasks of the
    /// batches following the failed one are cancelled before being discarded along with their
    /// batches. Returns the ids of the discarded batches.
    pub async fn reset_progress_partial(
        &self,
        failed: BatchId,
    ) -> Result<Vec<BatchId>, ResetError> {
        let following = self.batches_following(failed).await?;
        let cancelled = self.cancel_tasks(&following).await?;
        let purged = self.storage.reset_batches_partial(failed).await?;

        self.metrics.partial_resets.increment(1);
        self.metrics.purged_batches.increment(purged.len() as u64);
        tracing::info!(
            target: "sync_committee::reset",
            %failed,
            purged = purged.len(),
            cancelled,
            "reset progress to the parent of the failed batch"
        );
        Ok(purged)
    }

    /// Discards every batch which is not proved and cancels their pending proof tasks. The
    /// aggregator restarts from the proved state root. Returns the ids of the discarded batches.
    pub async fn reset_progress_full(&self) -> Result<Vec<BatchId>, ResetError> {
        // proved batches hold no task, every pending one belongs to a batch about to be discarded.
        let pending: Vec<BatchId> = self
            .storage
            .get_proof_tasks()
            .await?
            .into_iter()
            .filter(|task| !task.is_cancelled())
            .map(|task| task.batch_id)
            .collect();
        let cancelled = self.cancel_tasks(&pending).await?;
        let purged = self.storage.reset_batches_not_proved().await?;

        self.metrics.full_resets.increment(1);
        self.metrics.purged_batches.increment(purged.len() as u64);
        tracing::info!(
            target: "sync_committee::reset",
            purged = purged.len(),
            cancelled,
            "reset progress to the proved state"
        );
        Ok(purged)
    }

    /// Returns the ids of the batches following `failed` in the stored chain, latest first.
    async fn batches_following(&self, failed: BatchId) -> Result<Vec<BatchId>, ResetError> {
        let mut following = Vec::new();
        let mut next = self.storage.get_latest_batch().await?;
        while let Some(batch) = next {
            if batch.id() == failed {
                return Ok(following);
            }
            following.push(batch.id());
            next = match batch.parent_id() {
                Some(parent) => self.storage.get_batch(parent).await?,
                None => None,
            };
        }
        Ok(Vec::new())
    }

    async fn cancel_tasks(&self, batch_ids: &[BatchId]) -> Result<usize, ResetError> {
        if batch_ids.is_empty() {
            return Ok(0);
        }
        let cancelled = self.storage.cancel_proof_tasks(batch_ids).await?;
        self.metrics.cancelled_tasks.increment(cancelled as u64);
        Ok(cancelled)
    }
}

/// Resets the progress to the state finalized on L1 while the aggregator is paused.
#[derive(Debug)]
pub struct ResetLauncher<C, S, L> {
    syncer: Arc<StateRootSyncer<C, S, L>>,
    pause: PauseController,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<C, S, L> Clone for ResetLauncher<C, S, L> {
    fn clone(&self) -> Self {
        Self {
            syncer: self.syncer.clone(),
            pause: self.pause.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<C, S, L> ResetLauncher<C, S, L>
where
    C: L2Client + 'static,
    S: BatchStorage + 'static,
    L: RollupContract + 'static,
{
    /// Returns a new [`ResetLauncher`]. The controller must be the one pausing the aggregator.
    pub fn new(syncer: Arc<StateRootSyncer<C, S, L>>, pause: PauseController) -> Self {
        Self { syncer, pause, pending: Arc::default() }
    }

    /// Returns the state root syncer.
    pub const fn syncer(&self) -> &Arc<StateRootSyncer<C, S, L>> {
        &self.syncer
    }

    /// Returns the controller pausing the aggregator.
    pub const fn pause_controller(&self) -> &PauseController {
        &self.pause
    }

    /// Pauses the aggregator, discards the progress which is not proved and resynchronizes the
    /// local state root with L1. The aggregator resumes whatever the outcome. Returns the new
    /// local state root.
    pub async fn reset_to_l1(&self) -> Result<B256, ResetError> {
        self.pause.pause().await;
        let result = self.syncer.resync().await;
        self.pause.resume();
        Ok(result?)
    }

    /// Spawns [`Self::reset_to_l1`] in the background. Returns false if a reset launched earlier
    /// is still running, in which case no new reset is started.
    pub fn launch_reset_to_l1(&self) -> bool {
        let mut pending = self.pending.lock();
        if pending.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!(target: "sync_committee::reset", "reset to L1 already in progress");
            return false;
        }

        let this = self.clone();
        *pending = Some(tokio::spawn(async move {
            match this.reset_to_l1().await {
                Ok(root) => {
                    tracing::info!(target: "sync_committee::reset", %root, "reset to L1 done");
                }
                Err(err) => {
                    tracing::error!(target: "sync_committee::reset", %err, "reset to L1 failed");
                }
            }
        }));
        true
    }

    /// Waits for the reset launched by [`Self::launch_reset_to_l1`], if any.
    pub async fn wait_pending(&self) {
        let handle = self.pending.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::error!(target: "sync_committee::reset", %err, "reset task aborted");
            }
        }
    }
}
