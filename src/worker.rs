use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Liveness and cancellation surface of the external transfer worker.
///
/// The tracker never joins or restarts the worker; it only observes whether
/// the worker is still running and, on a fatal condition, signals it to stop.
pub trait WorkerHandle: Send + Sync {
    fn is_alive(&self) -> bool;

    /// Request the worker to stop. One-directional and terminal.
    fn cancel(&self);
}

/// A worker that reports its progress through the append-only log protocol
/// instead of leaving directly observable files behind.
#[async_trait]
pub trait ModelWorker: WorkerHandle {
    /// Current full progress log. Grows monotonically; the tracker only ever
    /// consumes the suffix past its own cursor.
    async fn progress_log(&self) -> String;

    /// Declared size in bytes per destination path, known up front.
    async fn declared_sizes(&self) -> HashMap<String, u64>;

    /// Secondary size estimate, consulted when the declared sizes do not sum
    /// to a positive total.
    async fn fallback_sizes(&self) -> HashMap<String, u64> {
        self.declared_sizes().await
    }
}

/// Handle over a transfer job spawned onto the runtime.
///
/// The job receives a [`CancellationToken`] and is expected to observe it at
/// its own pace; the completion flag flips once the task returns.
pub struct SpawnedWorker {
    token: CancellationToken,
    finished: Arc<AtomicBool>,
}

impl SpawnedWorker {
    pub fn spawn<F, Fut>(job: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let future = job(token.clone());
        let flag = finished.clone();
        tokio::spawn(async move {
            future.await;
            flag.store(true, Ordering::SeqCst);
        });
        Self { token, finished }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl WorkerHandle for SpawnedWorker {
    fn is_alive(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}
