#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Snapshot sources for the dashboard payload.
//!
//! A [`SnapshotSource`] produces one raw upstream payload. The
//! [`ResilientSource`] tries the live upstream first and falls back to a
//! locally persisted snapshot when the live fetch fails.

pub mod file;
pub mod http;
pub mod resilient;
pub mod retry;

use async_trait::async_trait;
use strum_macros::{AsRefStr, Display, EnumString};

pub use file::FileSnapshotSource;
pub use http::HttpSnapshotSource;
pub use resilient::ResilientSource;

/// Errors that can occur while loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status}")]
    Status {
        /// Status code received.
        status: u16,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload parsed but is not usable as a dashboard snapshot.
    #[error("Malformed snapshot: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },

    /// Both the live and the fallback source failed.
    #[error("No snapshot available (live: {live}; fallback: {fallback})")]
    Exhausted {
        /// Why the live fetch failed.
        live: String,
        /// Why the fallback read failed.
        fallback: String,
    },
}

/// Which state of the resilience shell produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SnapshotOrigin {
    /// Fetched from the upstream endpoint.
    Live,
    /// Read from the local fallback file.
    Fallback,
}

/// A raw upstream payload and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Source state.
    pub origin: SnapshotOrigin,
    /// The payload, always a JSON object.
    pub payload: serde_json::Value,
}

/// Something that can produce a raw dashboard payload.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human-readable description used in logs (a URL or a path).
    fn name(&self) -> &str;

    /// Fetches one payload.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the payload cannot be obtained or is
    /// not a JSON object.
    async fn fetch(&self) -> Result<serde_json::Value, SnapshotError>;
}

/// Rejects payloads that are not JSON objects.
///
/// # Errors
///
/// Returns [`SnapshotError::Malformed`] for any non-object value.
pub fn ensure_object(payload: serde_json::Value) -> Result<serde_json::Value, SnapshotError> {
    if payload.is_object() {
        Ok(payload)
    } else {
        Err(SnapshotError::Malformed {
            message: format!("expected a JSON object, got {}", kind_of(&payload)),
        })
    }
}

const fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
