use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Reachability check against a known-good reference endpoint.
///
/// Used only as a secondary signal when the stall detector has already seen
/// an extended run of unchanged progress: an unreachable network is
/// sufficient but not necessary evidence of a dead transfer.
#[async_trait]
pub trait Reachability: Send + Sync {
    /// True when `url` answers with HTTP 200 within the probe timeout.
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Production probe backed by a short-lived GET.
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Reachability for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_unreachable() {
        let probe = HttpProbe::new(Duration::from_secs(1));
        assert!(!probe.is_reachable("not a url at all").await);
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_unreachable() {
        let probe = HttpProbe::new(Duration::from_secs(1));
        assert!(
            !probe
                .is_reachable("http://this-host-does-not-exist.invalid/ping")
                .await
        );
    }
}
