pub mod fs;
pub mod log;
pub mod stall;

use crate::error::TrackerError;
use crate::sink::ProgressSink;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A destination file with a known target size.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// More progress is expected; keep polling.
    Pending,
    /// Every tracked file is accounted for; the loop can exit.
    Finished,
}

/// A source of transfer progress, polled once per cycle by the tracker.
///
/// The two implementations observe the same transfer through different
/// signals: [`fs::FsProgressSource`] reads on-disk file sizes directly,
/// [`log::LogProgressSource`] consumes the worker's textual progress log.
/// Within a cycle, per-file values are written to the sink strictly before
/// the aggregate value, and the aggregate key is written every cycle.
#[async_trait]
pub trait ProgressSource: Send {
    async fn poll(&mut self, sink: &ProgressSink) -> Result<PollStatus, TrackerError>;

    /// Invoked once after the loop exits, successfully or not.
    async fn finalize(&mut self, _sink: &ProgressSink) {}
}

/// Current on-disk length of `path`, or `None` while it does not exist as a
/// regular file yet.
pub(crate) async fn on_disk_len(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// Progress fraction guarding the unknown-total case: 0.0 instead of NaN.
pub(crate) fn ratio(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64
    }
}
