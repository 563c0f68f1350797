use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;

/// The metrics of the [`super::Aggregator`].
#[derive(Metrics, Clone)]
#[metrics(scope = "aggregator")]
pub(crate) struct AggregatorMetrics {
    /// The number of main shard blocks added to batches.
    pub fetched_main_blocks: Counter,
    /// The number of blocks of all shards added to batches.
    pub fetched_blocks: Counter,
    /// The number of batches sealed and committed.
    pub sealed_batches: Counter,
    /// The number of open batches discarded for exceeding the constraints.
    pub discarded_batches: Counter,
    /// The number of proof tasks created.
    pub proof_tasks: Counter,
    /// The number of iterations skipped because the node is not ready.
    pub skipped_iterations: Counter,
    /// The number of iterations which triggered a reset to L1.
    pub l1_resets_requested: Counter,
    /// The number of failed iterations.
    pub iteration_errors: Counter,
    /// The number of main shard blocks in the latest open batch.
    pub open_batch_blocks: Gauge,
    /// The duration of an iteration.
    pub iteration_duration: Histogram,
}

/// The metrics of the [`super::Resetter`].
#[derive(Metrics, Clone)]
#[metrics(scope = "reset")]
pub(crate) struct ResetMetrics {
    /// The number of partial resets.
    pub partial_resets: Counter,
    /// The number of full resets.
    pub full_resets: Counter,
    /// The number of batches discarded by resets.
    pub purged_batches: Counter,
    /// The number of proof tasks cancelled by resets.
    pub cancelled_tasks: Counter,
}

/// The metrics of the [`super::StateRootSyncer`].
#[derive(Metrics, Clone)]
#[metrics(scope = "syncer")]
pub(crate) struct SyncerMetrics {
    /// The number of times the local state root was initialized.
    pub initializations: Counter,
    /// The number of times the local state root was resynchronized with L1.
    pub resyncs: Counter,
    /// The number of failed synchronizations.
    pub failures: Counter,
}
