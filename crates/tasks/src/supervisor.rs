use crate::{Worker, WorkerError};
use std::sync::Arc;
use tokio::{sync::oneshot, task::JoinSet};
use tokio_util::sync::CancellationToken;

/// Runs a set of [`Worker`]s, fanning cancellation out to all of them.
#[derive(Default)]
pub struct Supervisor {
    workers: Vec<Arc<dyn Worker>>,
    cancel: CancellationToken,
}

impl core::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.workers.iter().map(|w| w.name()).collect();
        f.debug_struct("Supervisor")
            .field("workers", &names)
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl Supervisor {
    /// Returns a new [`Supervisor`] without workers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new [`Supervisor`] cancelled along with the provided token.
    pub fn with_cancellation(parent: &CancellationToken) -> Self {
        Self { workers: Vec::new(), cancel: parent.child_token() }
    }

    /// Adds a worker.
    pub fn add_worker(&mut self, worker: impl Worker + 'static) -> &mut Self {
        self.workers.push(Arc::new(worker));
        self
    }

    /// Returns the token cancelling all the workers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the workers and waits until every one of them signals it started.
    pub async fn start(self) -> Result<SupervisorHandle, WorkerError> {
        let mut tasks = JoinSet::new();
        let mut started = Vec::with_capacity(self.workers.len());

        for worker in self.workers {
            let (tx, rx) = oneshot::channel();
            let cancel = self.cancel.clone();
            let name = worker.name().to_string();
            started.push((name.clone(), rx));
            tasks.spawn(async move { (name, worker.run(cancel, tx).await) });
        }

        for (name, rx) in started {
            if rx.await.is_err() {
                self.cancel.cancel();
                tasks.shutdown().await;
                return Err(WorkerError::NotStarted(name));
            }
            tracing::debug!(target: "sync_committee::tasks", worker = %name, "worker started");
        }

        Ok(SupervisorHandle { tasks, cancel: self.cancel })
    }
}

/// A handle to the workers started by a [`Supervisor`].
#[derive(Debug)]
pub struct SupervisorHandle {
    tasks: JoinSet<(String, Result<(), WorkerError>)>,
    cancel: CancellationToken,
}

impl SupervisorHandle {
    /// Requests all the workers to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Returns the token cancelling all the workers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for all the workers to exit. The first worker failure cancels the remaining workers
    /// and is returned.
    pub async fn wait(mut self) -> Result<(), WorkerError> {
        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next().await {
            let (name, result) = match joined {
                Ok(joined) => joined,
                Err(err) => (String::new(), Err(WorkerError::Join(err.to_string()))),
            };
            match result {
                Ok(()) => {
                    tracing::debug!(target: "sync_committee::tasks", worker = %name, "exited");
                }
                Err(err) => {
                    tracing::error!(
                        target: "sync_committee::tasks",
                        worker = %name,
                        %err,
                        "worker failed"
                    );
                    self.cancel.cancel();
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Idle;

    #[async_trait::async_trait]
    impl Worker for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        async fn run(
            &self,
            cancel: CancellationToken,
            started: oneshot::Sender<()>,
        ) -> Result<(), WorkerError> {
            let _ = started.send(());
            cancel.cancelled().await;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing {
        before_start: bool,
    }

    #[async_trait::async_trait]
    impl Worker for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(
            &self,
            _cancel: CancellationToken,
            started: oneshot::Sender<()>,
        ) -> Result<(), WorkerError> {
            if !self.before_start {
                let _ = started.send(());
            }
            Err(WorkerError::failed("failing", "boom"))
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_workers() -> eyre::Result<()> {
        // Given
        let mut supervisor = Supervisor::new();
        supervisor.add_worker(Idle).add_worker(Idle);
        let handle = supervisor.start().await?;

        // When
        handle.shutdown();

        // Then
        handle.wait().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_cancels_other_workers() -> eyre::Result<()> {
        // Given
        let mut supervisor = Supervisor::new();
        supervisor.add_worker(Idle).add_worker(Failing { before_start: false });

        // When
        let handle = supervisor.start().await?;
        let result = handle.wait().await;

        // Then
        assert_eq!(result, Err(WorkerError::failed("failing", "boom")));
        Ok(())
    }

    #[tokio::test]
    async fn test_worker_exiting_before_start_is_reported() {
        let mut supervisor = Supervisor::new();
        supervisor.add_worker(Failing { before_start: true });

        let err = supervisor.start().await.unwrap_err();

        assert_eq!(err, WorkerError::NotStarted("failing".to_string()));
    }

    #[tokio::test]
    async fn test_parent_token_cancels_workers() -> eyre::Result<()> {
        let parent = CancellationToken::new();
        let mut supervisor = Supervisor::with_cancellation(&parent);
        supervisor.add_worker(Idle);
        let handle = supervisor.start().await?;

        parent.cancel();

        handle.wait().await?;
        Ok(())
    }
}
