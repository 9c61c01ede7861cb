use crate::error::TrackerError;
use async_trait::async_trait;

/// Destination file name and expected size derived from a source locator.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub file_name: String,
    pub size: u64,
}

/// Resolves source locators to `(file name, size)` pairs before tracking
/// starts. Any failure is fatal: tracking never begins on a file set whose
/// target sizes are unknown.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource, TrackerError>;
}

/// Resolver for HTTP(S) locators: the file name comes from the last path
/// segment of the URL, the size from the `Content-Length` of a HEAD request.
pub struct HttpSourceResolver {
    client: reqwest::Client,
}

impl HttpSourceResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSourceResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceResolver for HttpSourceResolver {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource, TrackerError> {
        let file_name = file_name_from_url(locator)
            .ok_or_else(|| TrackerError::InvalidSource(locator.to_string()))?;

        let response = self
            .client
            .head(locator)
            .send()
            .await
            .map_err(|e| TrackerError::InvalidSource(format!("{locator}: {e}")))?;

        if !response.status().is_success() {
            return Err(TrackerError::InvalidSource(format!(
                "{locator}: HTTP {}",
                response.status()
            )));
        }

        let size = response.content_length().ok_or_else(|| {
            TrackerError::InvalidSource(format!("{locator}: size not advertised"))
        })?;

        Ok(ResolvedSource { file_name, size })
    }
}

/// Last path segment of a URL, with any query or fragment stripped.
fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let rest = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, name) = rest.rsplit_once('/')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_plain_url() {
        assert_eq!(
            file_name_from_url("https://example.com/models/weights.bin"),
            Some("weights.bin".to_string())
        );
    }

    #[test]
    fn test_file_name_strips_query() {
        assert_eq!(
            file_name_from_url("https://example.com/files/readme.md?download=1"),
            Some("readme.md".to_string())
        );
    }

    #[test]
    fn test_file_name_missing() {
        assert_eq!(file_name_from_url("https://example.com/"), None);
        assert_eq!(file_name_from_url("https://example.com"), None);
    }

    #[tokio::test]
    async fn test_unresolvable_locator_fails_fast() {
        let resolver = HttpSourceResolver::new();
        let result = resolver
            .resolve("http://this-host-does-not-exist.invalid/file.bin")
            .await;
        assert!(matches!(result, Err(TrackerError::InvalidSource(_))));
    }
}
