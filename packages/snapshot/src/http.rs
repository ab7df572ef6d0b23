//! Live snapshot source: the upstream aggregation endpoint.

use std::time::Duration;

use async_trait::async_trait;

use crate::{SnapshotError, SnapshotSource, ensure_object, retry};

/// Fetches the payload from an HTTP endpoint on every call, uncached.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpSnapshotSource {
    /// Creates a source for `url`. `timeout` bounds each HTTP attempt.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Http`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, SnapshotError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
            max_retries,
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<serde_json::Value, SnapshotError> {
        log::debug!("Fetching live snapshot from {}", self.url);
        let payload = retry::send_json(
            || {
                self.client
                    .get(&self.url)
                    .header(reqwest::header::ACCEPT, "application/json")
            },
            self.max_retries,
        )
        .await?;
        ensure_object(payload)
    }
}
