use crate::{metrics::DatabaseMetrics, BatchStorage, DatabaseError};
use alloy_primitives::B256;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::{collections::HashMap, time::Instant};
use sync_committee_primitives::{BatchId, BlockBatch, BlockRefs, ProofTask, ProofTaskStatus};

/// The default maximum number of batches held in storage.
pub const DEFAULT_MAX_BATCHES: usize = 100;

/// The configuration of the [`InMemoryDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// The maximum number of batches held at once. Writes of new batches fail with
    /// [`DatabaseError::CapacityLimitReached`] once reached.
    pub max_batches: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { max_batches: DEFAULT_MAX_BATCHES }
    }
}

#[derive(Debug, Clone)]
struct BatchEntry {
    batch: BlockBatch,
    /// The latest fetched references at the time the batch was first written.
    fetched_before: BlockRefs,
    is_proved: bool,
}

#[derive(Debug, Default)]
struct State {
    batches: HashMap<BatchId, BatchEntry>,
    /// The ids of the stored batches, oldest first. Every batch is the parent of the next one.
    order: Vec<BatchId>,
    latest_fetched: BlockRefs,
    proved_state_root: Option<B256>,
    tasks: HashMap<BatchId, ProofTask>,
}

impl State {
    fn latest_id(&self) -> Option<BatchId> {
        self.order.last().copied()
    }

    /// Removes the batches along with their proof tasks.
    fn purge(&mut self, ids: &[BatchId]) {
        for id in ids {
            self.batches.remove(id);
            self.tasks.remove(id);
        }
    }
}

/// A capacity limited, in-memory implementation of [`BatchStorage`].
///
/// All the state sits behind a single lock, which makes every operation atomic.
#[derive(Debug)]
pub struct InMemoryDatabase {
    config: StorageConfig,
    state: RwLock<State>,
    metrics: DatabaseMetrics,
}

impl InMemoryDatabase {
    /// Returns a new empty [`InMemoryDatabase`].
    pub fn new(config: StorageConfig) -> Self {
        Self { config, state: RwLock::new(State::default()), metrics: DatabaseMetrics::default() }
    }

    /// Returns the configuration of the storage.
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the number of batches held.
    pub fn batches_count(&self) -> usize {
        self.state.read().batches.len()
    }

    /// Returns the number of proof tasks held.
    pub fn tasks_count(&self) -> usize {
        self.state.read().tasks.len()
    }

    /// Writes the batch under the held lock. Nothing is written when the write fails.
    fn put_locked(&self, state: &mut State, batch: &BlockBatch) -> Result<(), DatabaseError> {
        let latest = state.latest_id();

        if let Some(entry) = state.batches.get_mut(&batch.id()) {
            if latest != Some(batch.id()) {
                return Err(DatabaseError::LatestBatchMismatch { latest, batch: batch.id() });
            }
            if entry.batch.is_sealed() && entry.batch != *batch {
                return Err(DatabaseError::BatchSealed(batch.id()));
            }
            entry.batch = batch.clone();
        } else {
            if batch.parent_id() != latest {
                return Err(DatabaseError::LatestBatchMismatch { latest, batch: batch.id() });
            }
            if let Some(entry) = latest.and_then(|id| state.batches.get(&id)) {
                if !entry.batch.is_sealed() {
                    return Err(DatabaseError::LatestBatchNotSealed(entry.batch.id()));
                }
            }
            if state.batches.len() >= self.config.max_batches {
                self.metrics.capacity_rejections.increment(1);
                return Err(DatabaseError::CapacityLimitReached(self.config.max_batches));
            }

            state.batches.insert(
                batch.id(),
                BatchEntry {
                    batch: batch.clone(),
                    fetched_before: state.latest_fetched.clone(),
                    is_proved: false,
                },
            );
            state.order.push(batch.id());
            self.metrics.batches.set(state.batches.len() as f64);
        }

        state.latest_fetched.merge(batch.latest_refs());
        tracing::trace!(
            target: "sync_committee::db",
            batch_id = %batch.id(),
            sealed = batch.is_sealed(),
            blocks = batch.blocks_count(),
            "stored batch"
        );
        Ok(())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        let now = Instant::now();
        let guard = self.state.write();
        self.metrics.write_lock_acquire_duration.record(now.elapsed().as_secs_f64() * 1000.0);
        guard
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}

#[async_trait::async_trait]
impl BatchStorage for InMemoryDatabase {
    async fn get_latest_batch(&self) -> Result<Option<BlockBatch>, DatabaseError> {
        let state = self.state.read();
        Ok(state.latest_id().and_then(|id| state.batches.get(&id)).map(|e| e.batch.clone()))
    }

    async fn get_batch(&self, id: BatchId) -> Result<Option<BlockBatch>, DatabaseError> {
        Ok(self.state.read().batches.get(&id).map(|e| e.batch.clone()))
    }

    async fn put_batch(&self, batch: &BlockBatch) -> Result<(), DatabaseError> {
        let mut guard = self.write();
        self.put_locked(&mut guard, batch)
    }

    async fn put_sealed_batch(
        &self,
        batch: &BlockBatch,
        task: ProofTask,
    ) -> Result<(), DatabaseError> {
        if task.batch_id != batch.id() {
            return Err(DatabaseError::ProofTaskMismatch { task: task.batch_id, batch: batch.id() });
        }
        let mut guard = self.write();
        if guard.tasks.get(&task.batch_id).is_some_and(|t| !t.is_cancelled()) {
            return Err(DatabaseError::ProofTaskExists(task.batch_id));
        }
        self.put_locked(&mut guard, batch)?;
        guard.tasks.insert(task.batch_id, task);
        Ok(())
    }

    async fn get_latest_fetched(&self) -> Result<BlockRefs, DatabaseError> {
        Ok(self.state.read().latest_fetched.clone())
    }

    async fn get_proved_state_root(&self) -> Result<Option<B256>, DatabaseError> {
        Ok(self.state.read().proved_state_root)
    }

    async fn set_proved_state_root(&self, root: B256) -> Result<(), DatabaseError> {
        tracing::trace!(target: "sync_committee::db", %root, "setting proved state root");
        self.write().proved_state_root = Some(root);
        Ok(())
    }

    async fn set_batch_proved(&self, id: BatchId) -> Result<(), DatabaseError> {
        let mut guard = self.write();
        let state = &mut *guard;

        let position =
            state.order.iter().position(|b| *b == id).ok_or(DatabaseError::BatchNotFound(id))?;
        if let Some(entry) = state.batches.get_mut(&id) {
            entry.is_proved = true;
        }
        state.tasks.remove(&id);

        let superseded: Vec<BatchId> = state.order[..position]
            .iter()
            .copied()
            .filter(|b| state.batches.get(b).is_some_and(|e| e.is_proved))
            .collect();
        state.order.retain(|b| !superseded.contains(b));
        state.purge(&superseded);
        self.metrics.batches.set(state.batches.len() as f64);

        tracing::trace!(
            target: "sync_committee::db",
            batch_id = %id,
            evicted = superseded.len(),
            "batch proved"
        );
        Ok(())
    }

    async fn add_proof_task(&self, task: ProofTask) -> Result<(), DatabaseError> {
        let mut state = self.write();
        if !state.batches.contains_key(&task.batch_id) {
            return Err(DatabaseError::BatchNotFound(task.batch_id));
        }
        if state.tasks.get(&task.batch_id).is_some_and(|t| !t.is_cancelled()) {
            return Err(DatabaseError::ProofTaskExists(task.batch_id));
        }
        state.tasks.insert(task.batch_id, task);
        Ok(())
    }

    async fn get_proof_task(&self, batch_id: BatchId) -> Result<Option<ProofTask>, DatabaseError> {
        Ok(self.state.read().tasks.get(&batch_id).cloned())
    }

    async fn get_proof_tasks(&self) -> Result<Vec<ProofTask>, DatabaseError> {
        let mut tasks: Vec<ProofTask> = self.state.read().tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn cancel_proof_tasks(&self, batch_ids: &[BatchId]) -> Result<usize, DatabaseError> {
        let mut state = self.write();
        let mut cancelled = 0;
        for id in batch_ids {
            if let Some(task) = state.tasks.get_mut(id).filter(|t| !t.is_cancelled()) {
                task.status = ProofTaskStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn reset_batches_partial(&self, id: BatchId) -> Result<Vec<BatchId>, DatabaseError> {
        let mut guard = self.write();
        let state = &mut *guard;

        let position =
            state.order.iter().position(|b| *b == id).ok_or(DatabaseError::BatchNotFound(id))?;
        let fetched_before =
            state.batches.get(&id).map(|e| e.fetched_before.clone()).unwrap_or_default();

        let purged = state.order.split_off(position);
        state.purge(&purged);
        state.latest_fetched = fetched_before;
        self.metrics.batches.set(state.batches.len() as f64);
        self.metrics.purged_batches.increment(purged.len() as u64);

        tracing::debug!(
            target: "sync_committee::db",
            batch_id = %id,
            purged = purged.len(),
            "partially reset batches"
        );
        Ok(purged)
    }

    async fn reset_batches_not_proved(&self) -> Result<Vec<BatchId>, DatabaseError> {
        let mut guard = self.write();
        let state = &mut *guard;

        let (kept, purged): (Vec<BatchId>, Vec<BatchId>) = state
            .order
            .iter()
            .copied()
            .partition(|b| state.batches.get(b).is_some_and(|e| e.is_proved));
        state.order = kept;
        state.purge(&purged);
        state.latest_fetched.clear();
        self.metrics.batches.set(state.batches.len() as f64);
        self.metrics.purged_batches.increment(purged.len() as u64);

        tracing::debug!(
            target: "sync_committee::db",
            purged = purged.len(),
            "reset batches not proved"
        );
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{BlockNumber, B256};
    use std::time::SystemTime;
    use sync_committee_primitives::{
        Block, ChainSegment, ChainSegments, DataProof, ShardId, MAIN_SHARD_ID,
    };

    fn segments(shard_id: ShardId, from: BlockNumber, count: u64) -> ChainSegments {
        let blocks = (from..from + count)
            .map(|number| Block {
                shard_id,
                number,
                hash: B256::with_last_byte(number as u8),
                parent_hash: B256::with_last_byte(number.wrapping_sub(1) as u8),
                main_shard_hash: B256::ZERO,
                child_blocks: vec![],
                timestamp: number,
                transactions: vec![],
            })
            .collect();
        ChainSegments::from_segments([ChainSegment::new(blocks).unwrap()]).unwrap()
    }

    fn batch(parent: Option<BatchId>, from: BlockNumber, count: u64) -> BlockBatch {
        let now = SystemTime::now();
        BlockBatch::new(parent, now)
            .with_added_blocks(&segments(MAIN_SHARD_ID, from, count), now)
            .unwrap()
    }

    fn sealed(parent: Option<BatchId>, from: BlockNumber, count: u64) -> BlockBatch {
        let proof = DataProof::new(B256::ZERO, B256::ZERO, &[1; 48], &[2; 48]);
        batch(parent, from, count).seal(vec![proof].into(), SystemTime::now()).unwrap()
    }

    fn latest_main(refs: &BlockRefs) -> Option<BlockNumber> {
        refs.main_shard().map(|r| r.number)
    }

    #[tokio::test]
    async fn test_put_batch_advances_latest_fetched() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::default();
        let first = sealed(None, 1, 3);
        let second = batch(Some(first.id()), 4, 2);

        // When
        db.put_batch(&first).await?;
        db.put_batch(&second).await?;

        // Then
        assert_eq!(db.get_latest_batch().await?, Some(second.clone()));
        assert_eq!(db.get_batch(first.id()).await?, Some(first));
        assert_eq!(latest_main(&db.get_latest_fetched().await?), Some(5));

        // When
        let extended =
            second.with_added_blocks(&segments(MAIN_SHARD_ID, 6, 1), SystemTime::now())?;
        db.put_batch(&extended).await?;

        // Then
        assert_eq!(db.batches_count(), 2);
        assert_eq!(latest_main(&db.get_latest_fetched().await?), Some(6));

        Ok(())
    }

    #[tokio::test]
    async fn test_put_batch_rejects_stale_writers() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::default();
        let first = sealed(None, 1, 1);
        db.put_batch(&first).await?;

        // When
        let orphan = batch(None, 2, 1);
        let err = db.put_batch(&orphan).await.unwrap_err();

        // Then
        assert_eq!(
            err,
            DatabaseError::LatestBatchMismatch { latest: Some(first.id()), batch: orphan.id() }
        );
        assert!(err.is_consistency_error());

        // When
        let open = batch(Some(first.id()), 2, 1);
        db.put_batch(&open).await?;
        let sibling = batch(Some(open.id()), 3, 1);

        // Then
        assert_eq!(
            db.put_batch(&sibling).await.unwrap_err(),
            DatabaseError::LatestBatchNotSealed(open.id())
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_sealed_batch_cannot_be_overwritten() -> eyre::Result<()> {
        let db = InMemoryDatabase::default();
        let open = batch(None, 1, 1);
        let proof = DataProof::new(B256::ZERO, B256::ZERO, &[1; 48], &[2; 48]);
        let sealed = open.seal(vec![proof].into(), SystemTime::now())?;
        db.put_batch(&sealed).await?;

        // a retried write of the same sealed batch is accepted.
        db.put_batch(&sealed).await?;

        assert_eq!(db.put_batch(&open).await.unwrap_err(), DatabaseError::BatchSealed(open.id()));
        Ok(())
    }

    #[tokio::test]
    async fn test_capacity_limit() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::new(StorageConfig { max_batches: 2 });
        let first = sealed(None, 1, 1);
        let second = sealed(Some(first.id()), 2, 1);
        db.put_batch(&first).await?;
        db.put_batch(&second).await?;

        // When
        let err = db.put_batch(&batch(Some(second.id()), 3, 1)).await.unwrap_err();

        // Then
        assert_eq!(err, DatabaseError::CapacityLimitReached(2));
        assert!(err.is_capacity_limit());
        assert_eq!(latest_main(&db.get_latest_fetched().await?), Some(2));

        // When
        db.set_batch_proved(first.id()).await?;
        db.set_batch_proved(second.id()).await?;

        // Then
        assert_eq!(db.batches_count(), 1);
        db.put_batch(&batch(Some(second.id()), 3, 1)).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_reset_batches_partial() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::default();
        let first = sealed(None, 1, 2);
        let second = sealed(Some(first.id()), 3, 2);
        let third = batch(Some(second.id()), 5, 2);
        for b in [&first, &second, &third] {
            db.put_batch(b).await?;
        }

        // When
        let purged = db.reset_batches_partial(second.id()).await?;

        // Then
        assert_eq!(purged, vec![second.id(), third.id()]);
        assert_eq!(db.get_latest_batch().await?.map(|b| b.id()), Some(first.id()));
        assert_eq!(latest_main(&db.get_latest_fetched().await?), Some(2));
        assert_eq!(db.get_batch(third.id()).await?, None);

        // unknown batches are reported.
        assert_eq!(
            db.reset_batches_partial(third.id()).await.unwrap_err(),
            DatabaseError::BatchNotFound(third.id())
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_reset_first_batch_clears_latest_fetched() -> eyre::Result<()> {
        let db = InMemoryDatabase::default();
        let first = batch(None, 1, 2);
        db.put_batch(&first).await?;

        db.reset_batches_partial(first.id()).await?;

        assert!(db.get_latest_fetched().await?.is_empty());
        assert_eq!(db.get_latest_batch().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_batches_not_proved() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::default();
        let first = sealed(None, 1, 2);
        let second = sealed(Some(first.id()), 3, 2);
        let third = batch(Some(second.id()), 5, 2);
        for b in [&first, &second, &third] {
            db.put_batch(b).await?;
        }
        db.set_batch_proved(first.id()).await?;

        // When
        let purged = db.reset_batches_not_proved().await?;

        // Then
        assert_eq!(purged, vec![second.id(), third.id()]);
        assert_eq!(db.get_latest_batch().await?.map(|b| b.id()), Some(first.id()));
        assert!(db.get_latest_fetched().await?.is_empty());

        // the chain continues from the proved batch.
        db.put_batch(&batch(Some(first.id()), 3, 1)).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_proof_tasks() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::default();
        let first = sealed(None, 1, 2);
        db.put_batch(&first).await?;
        let task = ProofTask::for_batch(&first, SystemTime::now())?;

        // When
        db.add_proof_task(task.clone()).await?;

        // Then
        assert_eq!(db.get_proof_task(first.id()).await?, Some(task.clone()));
        assert_eq!(
            db.add_proof_task(task.clone()).await.unwrap_err(),
            DatabaseError::ProofTaskExists(first.id())
        );

        // When
        let cancelled = db.cancel_proof_tasks(&[first.id(), BatchId::new()]).await?;

        // Then
        assert_eq!(cancelled, 1);
        let tasks = db.get_proof_tasks().await?;
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].is_cancelled());
        assert_eq!(db.cancel_proof_tasks(&[first.id()]).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_put_sealed_batch_writes_batch_and_task_together() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::new(StorageConfig { max_batches: 1 });
        let first = sealed(None, 1, 2);
        let task = ProofTask::for_batch(&first, SystemTime::now())?;

        // When
        let other = ProofTask::for_batch(&sealed(None, 1, 2), SystemTime::now())?;
        let err = db.put_sealed_batch(&first, other.clone()).await.unwrap_err();

        // Then
        assert_eq!(
            err,
            DatabaseError::ProofTaskMismatch { task: other.batch_id, batch: first.id() }
        );
        assert_eq!(db.get_latest_batch().await?, None);
        assert_eq!(db.tasks_count(), 0);

        // When
        db.put_sealed_batch(&first, task.clone()).await?;

        // Then
        assert_eq!(db.get_latest_batch().await?, Some(first.clone()));
        assert_eq!(db.get_proof_task(first.id()).await?, Some(task));

        // When the batch cannot be written
        let second = sealed(Some(first.id()), 3, 1);
        let task = ProofTask::for_batch(&second, SystemTime::now())?;
        let err = db.put_sealed_batch(&second, task).await.unwrap_err();

        // Then the task is not written either
        assert!(err.is_capacity_limit());
        assert_eq!(db.get_proof_task(second.id()).await?, None);
        assert_eq!(latest_main(&db.get_latest_fetched().await?), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_proof_tasks_are_dropped_with_their_batches() -> eyre::Result<()> {
        // Given
        let db = InMemoryDatabase::default();
        let mut parent = None;
        let mut ids = Vec::new();
        for number in 0..50 {
            let batch = sealed(parent, number * 2 + 1, 2);
            db.put_batch(&batch).await?;
            db.add_proof_task(ProofTask::for_batch(&batch, SystemTime::now())?).await?;
            parent = Some(batch.id());
            ids.push(batch.id());
        }
        assert_eq!(db.tasks_count(), 50);

        // When
        for id in &ids[..40] {
            db.set_batch_proved(*id).await?;
        }

        // Then
        assert_eq!(db.batches_count(), 11);
        assert_eq!(db.tasks_count(), 10);
        assert_eq!(db.get_proof_task(ids[39]).await?, None);
        assert!(db.get_proof_task(ids[40]).await?.is_some());

        // When
        db.cancel_proof_tasks(&ids[45..]).await?;
        db.reset_batches_not_proved().await?;

        // Then
        assert_eq!(db.batches_count(), 1);
        assert_eq!(db.tasks_count(), 0);
        assert!(db.get_proof_tasks().await?.is_empty());

        // When
        let batch = sealed(Some(ids[39]), 81, 2);
        db.put_batch(&batch).await?;
        db.add_proof_task(ProofTask::for_batch(&batch, SystemTime::now())?).await?;
        db.reset_batches_partial(batch.id()).await?;

        // Then
        assert_eq!(db.tasks_count(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_proved_state_root() -> eyre::Result<()> {
        let db = InMemoryDatabase::default();
        assert_eq!(db.get_proved_state_root().await?, None);

        let root = B256::repeat_byte(0xab);
        db.set_proved_state_root(root).await?;

        assert_eq!(db.get_proved_state_root().await?, Some(root));
        Ok(())
    }
}
