#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Cross-domain risk fusion.
//!
//! [`fuse`] turns one loosely-typed upstream payload into a fully populated
//! [`DashboardDocument`]. The stages run in order:
//!
//! 1. [`extract`] normalizes each domain section into per-district signals.
//! 2. [`impute`] fills missing district risks with a ridge model built on
//!    [`features`] and solved by [`ridge`].
//! 3. [`alerts`] picks or synthesizes the alert feed.
//! 4. [`aggregate`] derives the KPI and department tiles.
//!
//! Fusion never fails. Malformed sections degrade to "absent" and
//! districts that cannot be scored keep an unset risk.

pub mod aggregate;
pub mod alerts;
pub mod config;
pub mod extract;
pub mod features;
pub mod impute;
pub mod numeric;
pub mod ridge;

use chrono::{DateTime, Utc};
use risk_fusion_models::{DashboardDocument, Domain};
use serde_json::{Map, Value};

pub use config::FusionConfig;

/// Errors raised while loading fusion configuration.
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Configuration is malformed or out of range.
    #[error("Invalid fusion config: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request inputs that are not part of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionRequest {
    /// Selected district, or `None` to aggregate across all districts.
    pub district: Option<String>,
    /// Timestamp stamped on synthesized alerts.
    pub now: DateTime<Utc>,
}

impl FusionRequest {
    /// A request for the whole-state view at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            district: None,
            now: Utc::now(),
        }
    }

    /// Scopes the request to `district`; blank names select all districts.
    #[must_use]
    pub fn with_district(mut self, district: Option<&str>) -> Self {
        self.district = district
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string);
        self
    }
}

/// Fuses an upstream payload into a dashboard document.
#[must_use]
pub fn fuse(payload: &Value, config: &FusionConfig, request: &FusionRequest) -> DashboardDocument {
    let signals = extract::extract(payload);
    let district = request.district.as_deref();

    let district_risks = impute::impute_district_risks(&signals, config);
    let alerts = alerts::fuse_alerts(
        &signals,
        &district_risks,
        config.synthetic_alert_limit,
        request.now,
    );
    let kpi_data = aggregate::derive_kpis(&signals, &district_risks, &alerts, config, district);
    let departments = aggregate::derive_departments(&signals, &district_risks, district);
    let pipelines = annotate_pipelines(payload, &signals);

    log::info!(
        "Assembled dashboard payload: {} districts, {} alerts, {} department entries",
        district_risks.len(),
        alerts.len(),
        departments.len(),
    );

    DashboardDocument {
        kpi_data,
        district_risks,
        alerts,
        departments,
        pipelines,
    }
}

/// Echoes the inbound `pipelines` section with a `status` on every known
/// domain.
fn annotate_pipelines(payload: &Value, signals: &extract::FusedSignals) -> Map<String, Value> {
    let mut pipelines = payload
        .get("pipelines")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    for domain in Domain::all() {
        let Some(status) = signals.section_status(*domain) else {
            continue;
        };
        let Some(section) = pipelines.get_mut(domain.section_key()) else {
            continue;
        };
        if !section.is_object() {
            let mut wrapped = Map::new();
            wrapped.insert("data".to_string(), section.take());
            *section = Value::Object(wrapped);
        }
        if let Value::Object(section) = section {
            section.insert("status".to_string(), Value::String(status.to_string()));
        }
    }

    pipelines
}
