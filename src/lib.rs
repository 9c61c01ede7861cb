//! # Transfer Tracker
//!
//! Progress tracking and stall detection for file transfers performed by an
//! independent worker.
//!
//! ## Features
//!
//! - Ordered progress sink with per-file and aggregate fractions
//! - File-system polling for workers that write directly to disk
//! - Incremental parsing of the append-only progress-log protocol
//! - Stall detection with a soft (connectivity-gated) and a hard threshold
//! - Cancellation-token based worker interruption on fatal conditions

pub mod error;
pub mod journal;
pub mod poller;
pub mod probe;
pub mod resolve;
pub mod sink;
pub mod tracker;
pub mod worker;

pub use error::TrackerError;
pub use journal::ProgressJournal;
pub use sink::{ProgressSink, TOTAL_PROGRESS_KEY};
pub use tracker::{TrackerConfig, TransferTracker};

/// Reference endpoint the connectivity probe checks by default. Expected to
/// answer plain HTTP 200 whenever the network is up.
pub const DEFAULT_REFERENCE_URL: &str = "http://captive.apple.com/hotspot-detect.html";
