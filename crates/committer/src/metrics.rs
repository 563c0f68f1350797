use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// The metrics for the [`super::Committer`].
#[derive(Metrics, Clone)]
#[metrics(scope = "committer")]
pub struct CommitterMetrics {
    /// The number of batches committed to L1.
    pub committed_batches: Counter,
    /// The number of blobs committed to L1.
    pub committed_blobs: Counter,
    /// The number of blobs per committed batch.
    pub blobs_per_batch: Histogram,
    /// The duration of the commitment preparation.
    pub preparation_duration: Histogram,
    /// The duration of the whole commit, L1 submission included.
    pub commit_duration: Histogram,
    /// The number of failed commits.
    pub failures: Counter,
}
