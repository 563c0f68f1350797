use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    /// The number of outstanding pause requests.
    pauses: AtomicUsize,
    /// Held for the duration of an iteration of the controlled work.
    in_flight: Mutex<()>,
}

/// Pauses and resumes a periodic piece of work.
///
/// The controlled work runs each iteration under an [`IterationGuard`] obtained from
/// [`PauseController::enter`]. [`PauseController::pause`] returns once the iteration in flight,
/// if any, has completed, and no further iteration starts until [`PauseController::resume`] is
/// called. Pauses nest: the work resumes once every pause is matched by a resume.
#[derive(Debug, Clone, Default)]
pub struct PauseController {
    inner: Arc<Inner>,
}

/// Marks an iteration of the controlled work as in flight.
#[derive(Debug)]
pub struct IterationGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl PauseController {
    /// Returns a new running [`PauseController`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the controlled work is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.pauses.load(Ordering::SeqCst) > 0
    }

    /// Pauses the controlled work, waiting for the iteration in flight to complete.
    pub async fn pause(&self) {
        self.inner.pauses.fetch_add(1, Ordering::SeqCst);
        drop(self.inner.in_flight.lock().await);
        tracing::debug!(target: "sync_committee::tasks", "paused");
    }

    /// Releases a pause. The controlled work restarts once no pause is outstanding.
    pub fn resume(&self) {
        let previous = self
            .inner
            .pauses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_default();
        if previous == 1 {
            tracing::debug!(target: "sync_committee::tasks", "resumed");
        }
    }

    /// Starts an iteration of the controlled work. Returns `None` if the work is paused.
    pub async fn enter(&self) -> Option<IterationGuard<'_>> {
        if self.is_paused() {
            return None;
        }
        let guard = self.inner.in_flight.lock().await;
        // a pause may have been requested while waiting for the lock.
        if self.is_paused() {
            return None;
        }
        Some(IterationGuard { _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_enter_is_refused_while_paused() {
        let controller = PauseController::new();
        assert!(controller.enter().await.is_some());

        controller.pause().await;
        controller.pause().await;
        assert!(controller.enter().await.is_none());

        controller.resume();
        assert!(controller.is_paused());

        controller.resume();
        assert!(controller.enter().await.is_some());
    }

    #[tokio::test]
    async fn test_pause_waits_for_iteration_in_flight() -> eyre::Result<()> {
        // Given
        let controller = PauseController::new();
        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

        let worker = controller.clone();
        let iteration = tokio::spawn(async move {
            let _guard = worker.enter().await;
            let _ = entered_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = done_tx.send(());
        });
        entered_rx.await?;

        // When
        controller.pause().await;

        // Then
        assert!(done_rx.try_recv().is_ok());
        iteration.await?;

        Ok(())
    }
}
