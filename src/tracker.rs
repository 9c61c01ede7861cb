use crate::error::TrackerError;
use crate::poller::fs::FsProgressSource;
use crate::poller::log::LogProgressSource;
use crate::poller::stall::{StallDetector, StallLimits};
use crate::poller::{PollStatus, ProgressSource, TrackedFile};
use crate::probe::{HttpProbe, Reachability};
use crate::resolve::SourceResolver;
use crate::sink::ProgressSink;
use crate::worker::{ModelWorker, WorkerHandle};
use crate::DEFAULT_REFERENCE_URL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Tracker tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Pause between poll cycles.
    pub poll_interval: Duration,
    /// Known-good endpoint the connectivity probe checks against.
    pub reference_url: String,
    /// Request timeout for the connectivity probe.
    pub probe_timeout: Duration,
    /// No-change cycles before an unreachable network turns fatal.
    pub soft_stall_cycles: u32,
    /// No-change cycles before the stall is fatal unconditionally.
    pub hard_stall_cycles: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            reference_url: DEFAULT_REFERENCE_URL.to_string(),
            probe_timeout: Duration::from_secs(5),
            soft_stall_cycles: 30,
            hard_stall_cycles: 60,
        }
    }
}

impl TrackerConfig {
    fn stall_limits(&self) -> StallLimits {
        StallLimits {
            soft_cycles: self.soft_stall_cycles,
            hard_cycles: self.hard_stall_cycles,
        }
    }
}

/// Monitors a transfer performed by an independent worker and reports
/// normalized progress into a shared [`ProgressSink`].
///
/// The tracker never moves bytes itself. It polls a progress source on a
/// fixed interval, watches for stalls, and on any fatal condition signals the
/// worker to stop before surfacing the error to the caller of
/// [`TransferTracker::track`]. Intended to run on its own task:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use transfer_tracker::{ProgressSink, TrackerConfig, TransferTracker};
/// # use transfer_tracker::worker::SpawnedWorker;
/// # use transfer_tracker::poller::TrackedFile;
/// # async fn example() -> Result<(), transfer_tracker::TrackerError> {
/// let sink = Arc::new(ProgressSink::new());
/// let worker = Arc::new(SpawnedWorker::spawn(|_token| async {}));
/// let files = vec![TrackedFile { path: "a.bin".into(), size: 1000 }];
/// let tracker = TransferTracker::for_tracked_files(
///     files, worker, sink.clone(), TrackerConfig::default());
/// let handle = tokio::spawn(tracker.track());
/// // ... read sink.snapshot() from here while the transfer runs ...
/// # handle.await.unwrap()
/// # }
/// ```
pub struct TransferTracker {
    source: Box<dyn ProgressSource>,
    worker: Arc<dyn WorkerHandle>,
    sink: Arc<ProgressSink>,
    probe: Arc<dyn Reachability>,
    config: TrackerConfig,
}

impl TransferTracker {
    /// Track a fixed file set, resolving every locator to a destination name
    /// and target size up front. Fails before tracking starts if any locator
    /// cannot be resolved.
    pub async fn for_files<W>(
        folder: &Path,
        locators: &[String],
        resolver: &dyn SourceResolver,
        worker: Arc<W>,
        sink: Arc<ProgressSink>,
        config: TrackerConfig,
    ) -> Result<Self, TrackerError>
    where
        W: WorkerHandle + 'static,
    {
        let source = FsProgressSource::resolve(folder, locators, resolver).await?;
        Ok(Self::assemble(Box::new(source), worker, sink, config))
    }

    /// Track an already-resolved file set.
    pub fn for_tracked_files<W>(
        files: Vec<TrackedFile>,
        worker: Arc<W>,
        sink: Arc<ProgressSink>,
        config: TrackerConfig,
    ) -> Self
    where
        W: WorkerHandle + 'static,
    {
        Self::assemble(
            Box::new(FsProgressSource::from_files(files)),
            worker,
            sink,
            config,
        )
    }

    /// Track a worker that reports through the log protocol.
    pub async fn for_model_worker<W>(
        worker: Arc<W>,
        sink: Arc<ProgressSink>,
        config: TrackerConfig,
    ) -> Self
    where
        W: ModelWorker + 'static,
    {
        let source = LogProgressSource::new(worker.clone() as Arc<dyn ModelWorker>).await;
        Self::assemble(Box::new(source), worker, sink, config)
    }

    fn assemble<W>(
        source: Box<dyn ProgressSource>,
        worker: Arc<W>,
        sink: Arc<ProgressSink>,
        config: TrackerConfig,
    ) -> Self
    where
        W: WorkerHandle + 'static,
    {
        let probe = Arc::new(HttpProbe::new(config.probe_timeout));
        Self {
            source,
            worker,
            sink,
            probe,
            config,
        }
    }

    /// Replace the connectivity probe. Mainly a seam for tests and for
    /// callers with their own reachability oracle.
    pub fn with_probe(mut self, probe: Arc<dyn Reachability>) -> Self {
        self.probe = probe;
        self
    }

    pub fn sink(&self) -> Arc<ProgressSink> {
        self.sink.clone()
    }

    /// Run the monitoring loop to completion.
    ///
    /// Returns `Ok(())` once every tracked file is accounted for or the
    /// worker has terminated on its own. On a stall or protocol violation the
    /// worker is cancelled and the error is returned.
    pub async fn track(mut self) -> Result<(), TrackerError> {
        let result = self.run().await;
        if result.is_err() {
            self.worker.cancel();
        }
        self.source.finalize(self.sink.as_ref()).await;
        result
    }

    async fn run(&mut self) -> Result<(), TrackerError> {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        let mut stall = StallDetector::new(self.config.stall_limits());

        loop {
            ticker.tick().await;

            if self.source.poll(self.sink.as_ref()).await? == PollStatus::Finished {
                info!("transfer complete");
                return Ok(());
            }
            if !self.worker.is_alive() {
                info!("worker terminated, stopping tracking");
                return Ok(());
            }
            stall
                .check(
                    self.sink.as_ref(),
                    self.probe.as_ref(),
                    &self.config.reference_url,
                )
                .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TrackerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(300));
        assert_eq!(config.soft_stall_cycles, 30);
        assert_eq!(config.hard_stall_cycles, 60);
        assert_eq!(config.reference_url, DEFAULT_REFERENCE_URL);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = TrackerConfig {
            poll_interval: Duration::from_millis(50),
            reference_url: "http://ref.example/ok".to_string(),
            probe_timeout: Duration::from_secs(1),
            soft_stall_cycles: 3,
            hard_stall_cycles: 6,
        };

        let json = serde_json::to_string(&config).expect("serialize");
        let back: TrackerConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.poll_interval, config.poll_interval);
        assert_eq!(back.reference_url, config.reference_url);
        assert_eq!(back.hard_stall_cycles, config.hard_stall_cycles);
    }
}
