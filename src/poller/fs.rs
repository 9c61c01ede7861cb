use super::{on_disk_len, ratio, PollStatus, ProgressSource, TrackedFile};
use crate::error::TrackerError;
use crate::resolve::SourceResolver;
use crate::sink::{ProgressSink, TOTAL_PROGRESS_KEY};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Progress source that polls on-disk sizes of an explicit file set.
pub struct FsProgressSource {
    remaining: Vec<TrackedFile>,
    completed_bytes: u64,
    grand_total: u64,
}

impl FsProgressSource {
    /// Resolve every locator up front and fail fast if any of them cannot be
    /// mapped to a destination name and target size.
    pub async fn resolve(
        folder: &Path,
        locators: &[String],
        resolver: &dyn SourceResolver,
    ) -> Result<Self, TrackerError> {
        let mut files = Vec::with_capacity(locators.len());
        for locator in locators {
            let resolved = resolver.resolve(locator).await?;
            files.push(TrackedFile {
                path: folder.join(&resolved.file_name),
                size: resolved.size,
            });
        }
        Ok(Self::from_files(files))
    }

    /// Track an already-resolved file set.
    pub fn from_files(files: Vec<TrackedFile>) -> Self {
        let grand_total = files.iter().map(|f| f.size).sum();
        Self {
            remaining: files,
            completed_bytes: 0,
            grand_total,
        }
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.remaining
    }
}

#[async_trait]
impl ProgressSource for FsProgressSource {
    async fn poll(&mut self, sink: &ProgressSink) -> Result<PollStatus, TrackerError> {
        let mut cycle_total = None;

        // One file per cycle: act on the first remaining file present on
        // disk, then wait for the next tick.
        for i in 0..self.remaining.len() {
            let file = &self.remaining[i];
            let Some(disk) = on_disk_len(&file.path).await else {
                continue;
            };
            let key = file.path.display().to_string();

            if disk < file.size {
                sink.set(&key, disk as f64 / file.size as f64).await;
                cycle_total = Some(ratio(self.completed_bytes + disk, self.grand_total));
            } else {
                sink.set(&key, 1.0).await;
                self.completed_bytes += file.size;
                self.remaining.remove(i);
                cycle_total = Some(ratio(self.completed_bytes, self.grand_total));
                debug!(file = %key, "file complete");
            }
            break;
        }

        let total = cycle_total.unwrap_or_else(|| ratio(self.completed_bytes, self.grand_total));
        sink.set(TOTAL_PROGRESS_KEY, total).await;

        if self.remaining.is_empty() {
            Ok(PollStatus::Finished)
        } else {
            Ok(PollStatus::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tracked(dir: &Path, name: &str, size: u64) -> TrackedFile {
        TrackedFile {
            path: dir.join(name),
            size,
        }
    }

    async fn grow(path: &PathBuf, len: u64) {
        let data = vec![0u8; len as usize];
        tokio::fs::write(path, data).await.unwrap();
    }

    #[tokio::test]
    async fn test_incremental_growth_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let a = tracked(dir.path(), "a.bin", 1000);
        let b = tracked(dir.path(), "b.bin", 2000);
        let (a_path, b_path) = (a.path.clone(), b.path.clone());
        let (a_key, b_key) = (
            a_path.display().to_string(),
            b_path.display().to_string(),
        );

        let mut source = FsProgressSource::from_files(vec![a, b]);
        let sink = ProgressSink::new();

        grow(&a_path, 0).await;
        grow(&b_path, 0).await;

        let mut a_len = 0u64;
        let mut b_len = 0u64;
        let mut status = PollStatus::Pending;
        for _ in 0..64 {
            if a_len < 1000 {
                a_len += 500;
                grow(&a_path, a_len).await;
            }
            if b_len < 2000 {
                b_len += 500;
                grow(&b_path, b_len).await;
            }
            status = source.poll(&sink).await.unwrap();
            if status == PollStatus::Finished {
                break;
            }
        }

        assert_eq!(status, PollStatus::Finished);
        assert_eq!(sink.get(&a_key).await, Some(1.0));
        assert_eq!(sink.get(&b_key).await, Some(1.0));
        assert_eq!(sink.total().await, 1.0);
    }

    #[tokio::test]
    async fn test_per_file_progress_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let file = tracked(dir.path(), "grow.bin", 1000);
        let path = file.path.clone();
        let key = path.display().to_string();

        let mut source = FsProgressSource::from_files(vec![file]);
        let sink = ProgressSink::new();

        let mut last = 0.0;
        for len in [0u64, 100, 100, 400, 900, 1000] {
            grow(&path, len).await;
            source.poll(&sink).await.unwrap();
            let reported = sink.get(&key).await.unwrap();
            assert!(reported >= last, "{reported} < {last}");
            last = reported;
        }
        assert_eq!(last, 1.0);
    }

    #[tokio::test]
    async fn test_missing_files_still_write_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        let file = tracked(dir.path(), "never.bin", 1000);
        let mut source = FsProgressSource::from_files(vec![file]);
        let sink = ProgressSink::new();

        let status = source.poll(&sink).await.unwrap();
        assert_eq!(status, PollStatus::Pending);
        assert_eq!(sink.get(TOTAL_PROGRESS_KEY).await, Some(0.0));
    }

    #[tokio::test]
    async fn test_one_file_processed_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let a = tracked(dir.path(), "a.bin", 100);
        let b = tracked(dir.path(), "b.bin", 100);
        let (a_path, b_path) = (a.path.clone(), b.path.clone());
        let b_key = b_path.display().to_string();

        let mut source = FsProgressSource::from_files(vec![a, b]);
        let sink = ProgressSink::new();

        grow(&a_path, 50).await;
        grow(&b_path, 50).await;

        // First cycle touches only the first file.
        source.poll(&sink).await.unwrap();
        assert_eq!(sink.get(&b_key).await, None);

        // Second file is only reached once the first stops changing the scan.
        source.poll(&sink).await.unwrap();
        assert_eq!(sink.get(&b_key).await, None);
    }
}
