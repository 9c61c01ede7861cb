use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use transfer_tracker::worker::{ModelWorker, WorkerHandle};
use transfer_tracker::{ProgressJournal, ProgressSink, TrackerConfig, TransferTracker};

/// Simulated log-protocol worker: writes real files into a scratch directory
/// in small chunks while reporting through the progress journal.
struct DemoWorker {
    journal: Arc<ProgressJournal>,
    sizes: HashMap<String, u64>,
    token: CancellationToken,
    finished: Arc<AtomicBool>,
}

impl DemoWorker {
    fn start(files: Vec<(String, u64)>) -> Arc<Self> {
        let journal = Arc::new(ProgressJournal::new());
        let token = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let sizes: HashMap<String, u64> = files.iter().cloned().collect();

        let worker = Arc::new(Self {
            journal: journal.clone(),
            sizes,
            token: token.clone(),
            finished: finished.clone(),
        });

        tokio::spawn(async move {
            for (path, size) in files {
                journal.record_start(&path).await;
                journal.record_size(size).await;

                let mut written = 0u64;
                while written < size {
                    if token.is_cancelled() {
                        journal.record_error().await;
                        journal.record_end().await;
                        finished.store(true, Ordering::SeqCst);
                        return;
                    }
                    let chunk = (size - written).min(size / 4).max(1);
                    written += chunk;
                    let _ = tokio::fs::write(&path, vec![0u8; written as usize]).await;
                    tokio::time::sleep(Duration::from_millis(120)).await;
                }
                journal.record_end().await;
            }
            journal.record_finish().await;
            finished.store(true, Ordering::SeqCst);
        });

        worker
    }
}

impl WorkerHandle for DemoWorker {
    fn is_alive(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

#[async_trait]
impl ModelWorker for DemoWorker {
    async fn progress_log(&self) -> String {
        self.journal.snapshot().await
    }

    async fn declared_sizes(&self) -> HashMap<String, u64> {
        self.sizes.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), transfer_tracker::TrackerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("starting transfer-tracker demo...");

    let scratch = std::env::temp_dir().join("transfer-tracker-demo");
    tokio::fs::create_dir_all(&scratch).await?;

    let files = vec![
        (scratch.join("alpha.bin").display().to_string(), 4096u64),
        (scratch.join("beta.bin").display().to_string(), 8192u64),
    ];
    let worker = DemoWorker::start(files);

    let sink = Arc::new(ProgressSink::new());
    let tracker =
        TransferTracker::for_model_worker(worker, sink.clone(), TrackerConfig::default()).await;

    let tracking = tokio::spawn(tracker.track());

    // Observe from the caller's side while tracking runs on its own task.
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        println!("  progress: {:.1}%", sink.total().await * 100.0);
        if tracking.is_finished() {
            break;
        }
    }

    match tracking.await {
        Ok(result) => result?,
        Err(e) => {
            eprintln!("tracking task panicked: {e}");
            return Ok(());
        }
    }

    let snapshot = sink.snapshot().await;
    let rendered: Vec<String> = snapshot
        .iter()
        .map(|(key, value)| serde_json::json!({ "file": key, "progress": value }).to_string())
        .collect();
    println!("final state:");
    for line in rendered {
        println!("  {line}");
    }
    println!("demo complete");

    Ok(())
}
