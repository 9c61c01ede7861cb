use std::collections::HashMap;
use tokio::sync::RwLock;

/// Reserved sink key holding the aggregate progress across all tracked files.
pub const TOTAL_PROGRESS_KEY: &str = "total";

/// Ordered key/value store the tracker reports progress into.
///
/// Keys are file paths plus the reserved [`TOTAL_PROGRESS_KEY`]; values are
/// fractions of the corresponding target size. The tracker is the only
/// writer; callers read concurrently and observe the values written at the
/// end of each poll cycle. Entries are never removed and keys keep their
/// insertion order.
#[derive(Debug, Default)]
pub struct ProgressSink {
    inner: RwLock<SinkInner>,
}

#[derive(Debug, Default)]
struct SinkInner {
    order: Vec<String>,
    values: HashMap<String, f64>,
}

impl ProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `key`. Last write wins.
    pub async fn set(&self, key: &str, value: f64) {
        let mut inner = self.inner.write().await;
        if !inner.values.contains_key(key) {
            inner.order.push(key.to_string());
        }
        inner.values.insert(key.to_string(), value);
    }

    /// Last value written for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<f64> {
        self.inner.read().await.values.get(key).copied()
    }

    /// Current aggregate progress, 0.0 when nothing has been reported yet.
    pub async fn total(&self) -> f64 {
        self.get(TOTAL_PROGRESS_KEY).await.unwrap_or(0.0)
    }

    /// All entries in insertion order.
    pub async fn snapshot(&self) -> Vec<(String, f64)> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|key| inner.values.get(key).map(|v| (key.clone(), *v)))
            .collect()
    }
}
