use metrics::{Counter, Gauge, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::InMemoryDatabase`].
#[derive(Metrics, Clone)]
#[metrics(scope = "database")]
pub(crate) struct DatabaseMetrics {
    /// Time (ms) to acquire the storage write lock.
    #[metric(describe = "Time to acquire the storage write lock (ms)")]
    pub write_lock_acquire_duration: Histogram,
    /// The number of batches held in storage.
    pub batches: Gauge,
    /// The number of writes rejected because the storage was full.
    pub capacity_rejections: Counter,
    /// The number of batches discarded by resets.
    pub purged_batches: Counter,
}
