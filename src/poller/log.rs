use super::{on_disk_len, ratio, PollStatus, ProgressSource};
use crate::error::TrackerError;
use crate::journal::{
    END_MARKER, ERROR_MARKER, FILE_SIZE_MARKER, FINISH_MARKER, START_MARKER,
};
use crate::sink::{ProgressSink, TOTAL_PROGRESS_KEY};
use crate::worker::ModelWorker;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Progress source that consumes the worker's append-only progress log
/// through an incremental cursor.
///
/// Bytes before the cursor are never re-parsed. At most one record event is
/// consumed per cycle; while a record is still being appended, only the
/// growing declared-size text after the cursor is re-read.
pub struct LogProgressSource {
    worker: Arc<dyn ModelWorker>,
    cursor: usize,
    pending: Option<String>,
    transferred: HashMap<String, u64>,
    grand_total: u64,
    finished: bool,
}

impl LogProgressSource {
    pub async fn new(worker: Arc<dyn ModelWorker>) -> Self {
        let mut grand_total: u64 = worker.declared_sizes().await.values().sum();
        if grand_total == 0 {
            grand_total = worker.fallback_sizes().await.values().sum();
        }
        Self {
            worker,
            cursor: 0,
            pending: None,
            transferred: HashMap::new(),
            grand_total,
            finished: false,
        }
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor
    }

    /// Open the next record or consume a terminal FINISH. Leaves the cursor
    /// just past `START <path> FILE_SIZE` so the size text that follows can
    /// be re-read until the record closes.
    fn scan_idle(&mut self, log: &str) {
        let suffix = &log[self.cursor..];
        let start = suffix.find(START_MARKER);
        let finish = suffix.find(FINISH_MARKER);

        match (start, finish) {
            (Some(s), fin) if fin.map_or(true, |fin| s < fin) => {
                if let Some(size_rel) = suffix[s..].find(FILE_SIZE_MARKER) {
                    let path = suffix[s + START_MARKER.len()..s + size_rel]
                        .trim()
                        .to_string();
                    self.cursor += s + size_rel + FILE_SIZE_MARKER.len();
                    self.pending = Some(path);
                }
                // START without FILE_SIZE yet: record still being written.
            }
            (_, Some(fin)) => {
                self.cursor += fin + FINISH_MARKER.len();
                self.finished = true;
            }
            (_, None) => {}
        }
    }

    /// Advance the open record: complete it on END, drop it on ERROR, or
    /// report best-effort progress while it is still in flight.
    async fn scan_pending(
        &mut self,
        path: &str,
        log: &str,
        sink: &ProgressSink,
    ) -> Result<(), TrackerError> {
        let suffix = &log[self.cursor..];
        let end = suffix.find(END_MARKER);
        let error = suffix.find(ERROR_MARKER);

        match (end, error) {
            (Some(e), err) if err.map_or(true, |r| r > e) => {
                let size_text = suffix[..e].trim();
                let declared: u64 = size_text.parse().map_err(|_| {
                    TrackerError::Protocol(format!(
                        "declared size for '{path}' is not an integer: '{size_text}'"
                    ))
                })?;
                let disk = on_disk_len(Path::new(path)).await.unwrap_or(0);
                sink.set(path, ratio(disk, declared)).await;
                self.transferred.insert(path.to_string(), disk);
                self.cursor += e + END_MARKER.len();
                self.pending = None;
                debug!(file = %path, declared, disk, "record complete");
            }
            (e, Some(r)) => {
                sink.set(path, 0.0).await;
                self.transferred.remove(path);
                self.cursor += match e {
                    Some(e) => e + END_MARKER.len(),
                    None => r + ERROR_MARKER.len(),
                };
                self.pending = None;
                warn!(file = %path, "worker reported a failed file");
            }
            (_, None) => {
                // The declared-size digits may still be growing; a short read
                // here can transiently push the reported ratio above 1 until
                // the next cycle corrects it.
                if let Ok(declared) = suffix.trim().parse::<u64>() {
                    if declared > 0 {
                        let disk = on_disk_len(Path::new(path)).await.unwrap_or(0);
                        sink.set(path, disk as f64 / declared as f64).await;
                        self.transferred.insert(path.to_string(), disk);
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressSource for LogProgressSource {
    async fn poll(&mut self, sink: &ProgressSink) -> Result<PollStatus, TrackerError> {
        let log = self.worker.progress_log().await;

        if self.pending.is_none() && !self.finished {
            self.scan_idle(&log);
        }
        if let Some(path) = self.pending.clone() {
            self.scan_pending(&path, &log, sink).await?;
        }

        let accumulated: u64 = self.transferred.values().sum();
        sink.set(TOTAL_PROGRESS_KEY, ratio(accumulated, self.grand_total))
            .await;

        if self.finished {
            Ok(PollStatus::Finished)
        } else {
            Ok(PollStatus::Pending)
        }
    }

    async fn finalize(&mut self, sink: &ProgressSink) {
        let accumulated: u64 = self.transferred.values().sum();
        sink.set(TOTAL_PROGRESS_KEY, ratio(accumulated, self.grand_total))
            .await;
    }
}
