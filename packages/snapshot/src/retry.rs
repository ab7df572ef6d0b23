//! HTTP retry helpers for transient errors.
//!
//! The live source goes through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so transient failures
//! (timeouts, connection resets, server errors, rate limiting) are retried
//! with exponential backoff before the resilience shell falls back.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url), max_retries).await?;
//! ```

use std::time::Duration;

use crate::SnapshotError;

/// Delay before the first retry; doubles on every further attempt.
const BASE_DELAY_MS: u64 = 250;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Retries up to `max_retries` times on connection errors, timeouts,
/// HTTP 429 and HTTP 5xx. Does **not** retry other 4xx responses or a body
/// that fails to parse.
///
/// # Errors
///
/// Returns [`SnapshotError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    max_retries: u32,
) -> Result<serde_json::Value, SnapshotError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;

    let url = response.url().to_string();
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|json_err| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             content-type: {content_type:?}\n  \
             received: {} bytes\n  \
             parse error: {json_err}\n  \
             body preview: {preview}",
            text.len(),
        );
        SnapshotError::Json(json_err)
    })
}

/// Core retry loop.
///
/// Sends the request built by `build_request`, retrying on transient
/// errors up to `max_retries` times with exponential backoff. Returns
/// the successful [`reqwest::Response`] (status 2xx or 3xx).
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, SnapshotError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        let error = match build_request().send().await {
            Ok(response) if is_retryable_status(response.status()) => SnapshotError::Status {
                status: response.status().as_u16(),
            },
            Ok(response) if response.status().is_client_error() => {
                return Err(SnapshotError::Status {
                    status: response.status().as_u16(),
                });
            }
            Ok(response) => return Ok(response),
            Err(e) if is_transient(&e) => SnapshotError::Http(e),
            Err(e) => return Err(SnapshotError::Http(e)),
        };

        if attempt >= max_retries {
            return Err(error);
        }
        attempt += 1;
        let delay = backoff(attempt);
        log::warn!("  {error}; retry {attempt}/{max_retries} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

/// 429 Too Many Requests and every 5xx are worth another attempt.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_DELAY_MS << attempt.saturating_sub(1).min(10))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
