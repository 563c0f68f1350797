use crate::{PauseController, WorkerError};
use metrics::{Counter, Histogram};
use metrics_derive::Metrics;
use std::time::{Duration, Instant};
use tokio::{sync::oneshot, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A long running background worker.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Box, Arc)]
pub trait Worker: Send + Sync {
    /// Returns the name of the worker.
    fn name(&self) -> &str;

    /// Runs the worker until the token is cancelled. The worker sends on `started` once it is
    /// ready to do its work.
    async fn run(
        &self,
        cancel: CancellationToken,
        started: oneshot::Sender<()>,
    ) -> Result<(), WorkerError>;
}

/// A piece of work executed at a fixed interval.
#[async_trait::async_trait]
#[auto_impl::auto_impl(Box, Arc)]
pub trait PeriodicTask: Send + Sync {
    /// Returns the name of the task.
    fn name(&self) -> &str;

    /// Returns the interval between two executions.
    fn interval(&self) -> Duration;

    /// Executes the task once.
    async fn tick(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The metrics of a [`PeriodicWorker`].
#[derive(Metrics, Clone)]
#[metrics(scope = "worker")]
pub(crate) struct WorkerMetrics {
    /// The number of executions of the task.
    pub ticks: Counter,
    /// The number of failed executions of the task.
    pub failures: Counter,
    /// The number of executions skipped while paused.
    pub paused_ticks: Counter,
    /// The duration of an execution of the task.
    pub tick_duration: Histogram,
}

/// A [`Worker`] executing a [`PeriodicTask`] until cancelled.
///
/// A failed execution is logged and the task runs again at the next interval. When a
/// [`PauseController`] is attached, executions are skipped while paused.
#[derive(Debug)]
pub struct PeriodicWorker<T> {
    task: T,
    pause: Option<PauseController>,
    metrics: WorkerMetrics,
}

impl<T: PeriodicTask> PeriodicWorker<T> {
    /// Returns a new [`PeriodicWorker`] for the task.
    pub fn new(task: T) -> Self {
        let metrics = WorkerMetrics::new_with_labels(&[("worker", task.name().to_string())]);
        Self { task, pause: None, metrics }
    }

    /// Attaches the controller pausing the worker.
    pub fn with_pause_controller(mut self, pause: PauseController) -> Self {
        self.pause = Some(pause);
        self
    }

    /// Returns the task executed by the worker.
    pub const fn task(&self) -> &T {
        &self.task
    }

    async fn execute(&self) {
        let _guard = match &self.pause {
            Some(pause) => match pause.enter().await {
                Some(guard) => Some(guard),
                None => {
                    self.metrics.paused_ticks.increment(1);
                    tracing::trace!(
                        target: "sync_committee::tasks",
                        task = self.task.name(),
                        "paused, skipping tick"
                    );
                    return;
                }
            },
            None => None,
        };

        let start = Instant::now();
        let result = self.task.tick().await;
        self.metrics.ticks.increment(1);
        self.metrics.tick_duration.record(start.elapsed().as_secs_f64());

        if let Err(err) = result {
            self.metrics.failures.increment(1);
            tracing::error!(
                target: "sync_committee::tasks",
                task = self.task.name(),
                %err,
                "task failed"
            );
        }
    }
}

#[async_trait::async_trait]
impl<T: PeriodicTask> Worker for PeriodicWorker<T> {
    fn name(&self) -> &str {
        self.task.name()
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        started: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        let mut interval = tokio::time::interval(self.task.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let _ = started.send(());
        tracing::info!(
            target: "sync_committee::tasks",
            task = self.task.name(),
            interval = ?self.task.interval(),
            "started periodic worker"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = self.execute() => {}
                    }
                }
            }
        }

        tracing::info!(target: "sync_committee::tasks", task = self.task.name(), "stopped");
        Ok(())
    }
}
