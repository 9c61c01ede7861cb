use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use transfer_tracker::error::TrackerError;
use transfer_tracker::poller::TrackedFile;
use transfer_tracker::probe::Reachability;
use transfer_tracker::worker::{SpawnedWorker, WorkerHandle};
use transfer_tracker::{ProgressSink, TrackerConfig, TransferTracker};

struct FixedProbe(bool);

#[async_trait]
impl Reachability for FixedProbe {
    async fn is_reachable(&self, _url: &str) -> bool {
        self.0
    }
}

fn stall_config() -> TrackerConfig {
    TrackerConfig {
        poll_interval: Duration::from_millis(10),
        soft_stall_cycles: 3,
        hard_stall_cycles: 6,
        ..Default::default()
    }
}

/// Worker that never produces anything and only exits when cancelled.
fn idle_worker() -> Arc<SpawnedWorker> {
    Arc::new(SpawnedWorker::spawn(|token| async move {
        token.cancelled().await;
    }))
}

fn never_appearing_file(dir: &tempfile::TempDir) -> Vec<TrackedFile> {
    vec![TrackedFile {
        path: dir.path().join("never.bin"),
        size: 1000,
    }]
}

#[tokio::test]
async fn test_hard_stall_fires_despite_healthy_network() {
    let dir = tempdir().unwrap();
    let worker = idle_worker();
    let sink = Arc::new(ProgressSink::new());

    let tracker = TransferTracker::for_tracked_files(
        never_appearing_file(&dir),
        worker.clone(),
        sink.clone(),
        stall_config(),
    )
    .with_probe(Arc::new(FixedProbe(true)));

    let result = tracker.track().await;
    match result {
        Err(TrackerError::HardStall { cycles }) => assert_eq!(cycles, 7),
        other => panic!("expected hard stall, got {other:?}"),
    }

    // The worker was signalled to stop.
    assert!(worker.token().is_cancelled());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!worker.is_alive());
}

#[tokio::test]
async fn test_soft_stall_fires_when_network_is_down() {
    let dir = tempdir().unwrap();
    let worker = idle_worker();
    let sink = Arc::new(ProgressSink::new());

    let tracker = TransferTracker::for_tracked_files(
        never_appearing_file(&dir),
        worker.clone(),
        sink.clone(),
        stall_config(),
    )
    .with_probe(Arc::new(FixedProbe(false)));

    let result = tracker.track().await;
    match result {
        Err(TrackerError::SoftStall { cycles }) => assert_eq!(cycles, 4),
        other => panic!("expected soft stall, got {other:?}"),
    }
    assert!(worker.token().is_cancelled());
}

#[tokio::test]
async fn test_progress_keeps_the_tracker_alive_past_the_thresholds() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("slow.bin");
    let files = vec![TrackedFile {
        path: path.clone(),
        size: 200,
    }];

    // One byte per poll-ish: slower than the hard threshold would allow if
    // progress were ignored, but progress resets the counter every cycle.
    let worker = Arc::new(SpawnedWorker::spawn(|_token| async move {
        for len in 1..=200usize {
            tokio::fs::write(&path, vec![0u8; len]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }));

    let sink = Arc::new(ProgressSink::new());
    let config = TrackerConfig {
        poll_interval: Duration::from_millis(10),
        soft_stall_cycles: 25,
        hard_stall_cycles: 50,
        ..Default::default()
    };
    let tracker = TransferTracker::for_tracked_files(files, worker, sink.clone(), config)
        .with_probe(Arc::new(FixedProbe(true)));

    tracker.track().await.expect("steady progress must not stall");
    assert_eq!(sink.total().await, 1.0);
}
