//! Append-only progress log and its marker vocabulary.
//!
//! A log-protocol worker reports each file as a left-to-right record:
//! `START <path> FILE_SIZE <bytes> END`, with an optional `ERROR` between
//! `START` and `END` for a failed file, and a single terminal `FINISH` once
//! every file has been handled. The parser in `poller::log` searches for
//! these literal tokens positionally.

use tokio::sync::RwLock;

pub const START_MARKER: &str = "START";
pub const FILE_SIZE_MARKER: &str = "FILE_SIZE";
pub const END_MARKER: &str = "END";
pub const FINISH_MARKER: &str = "FINISH";
pub const ERROR_MARKER: &str = "ERROR";

/// Single-producer append-only log buffer.
///
/// The worker appends record fragments; the tracker reads snapshots and
/// consumes them through its own monotonically increasing cursor.
#[derive(Debug, Default)]
pub struct ProgressJournal {
    buf: RwLock<String>,
}

impl ProgressJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, fragment: &str) {
        self.buf.write().await.push_str(fragment);
    }

    pub async fn record_start(&self, path: &str) {
        self.append(&format!("{START_MARKER} {path} ")).await;
    }

    pub async fn record_size(&self, bytes: u64) {
        self.append(&format!("{FILE_SIZE_MARKER} {bytes} ")).await;
    }

    pub async fn record_end(&self) {
        self.append(&format!("{END_MARKER} ")).await;
    }

    pub async fn record_error(&self) {
        self.append(&format!("{ERROR_MARKER} ")).await;
    }

    pub async fn record_finish(&self) {
        self.append(FINISH_MARKER).await;
    }

    pub async fn snapshot(&self) -> String {
        self.buf.read().await.clone()
    }
}
