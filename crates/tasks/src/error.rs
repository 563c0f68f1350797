/// The error type of the workers run by the [`Supervisor`](crate::Supervisor).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The worker exited before signaling it started.
    #[error("worker {0} exited before starting")]
    NotStarted(String),
    /// The worker failed.
    #[error("worker {name} failed: {reason}")]
    Failed {
        /// The name of the worker.
        name: String,
        /// The reason of the failure.
        reason: String,
    },
    /// The task running the worker panicked or was aborted.
    #[error("worker task could not be joined: {0}")]
    Join(String),
}

impl WorkerError {
    /// Returns a [`WorkerError::Failed`] for the worker.
    pub fn failed(name: impl Into<String>, reason: impl core::fmt::Display) -> Self {
        Self::Failed { name: name.into(), reason: reason.to_string() }
    }
}
