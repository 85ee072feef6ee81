use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Lifecycle of a long-running worker (ingestion source or analyzer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    StopRequested,
    Terminated,
}

impl WorkerState {
    fn is_stopping(self) -> bool {
        matches!(self, WorkerState::StopRequested | WorkerState::Terminated)
    }
}

/// Shared state cell for one worker. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<WorkerState>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(WorkerState::Idle);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> WorkerState {
        *self.tx.borrow()
    }

    /// `Idle -> Running`. Returns false if a stop was already requested.
    pub fn begin(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if *s == WorkerState::Idle {
                *s = WorkerState::Running;
                true
            } else {
                false
            }
        })
    }

    /// `Idle | Running -> StopRequested`. Idempotent; returns true only on the transition.
    pub fn request_stop(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if matches!(*s, WorkerState::Idle | WorkerState::Running) {
                *s = WorkerState::StopRequested;
                true
            } else {
                false
            }
        })
    }

    pub fn is_stop_requested(&self) -> bool {
        self.state().is_stopping()
    }

    pub fn finish(&self) {
        self.tx.send_replace(WorkerState::Terminated);
    }

    /// Resolves once a stop has been requested (or the worker has already terminated).
    pub async fn stop_requested(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| s.is_stopping()).await;
    }

    pub async fn terminated(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| *s == WorkerState::Terminated).await;
    }

    /// Sleep for `duration` unless a stop arrives first. Returns true when stopping.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_stop_requested(),
            _ = self.stop_requested() => true,
        }
    }
}
