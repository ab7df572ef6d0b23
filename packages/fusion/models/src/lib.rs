#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dashboard data model for the cross-domain risk fusion engine.
//!
//! These types describe the fused document handed to the dashboard: per
//! district risk scores, headline KPI tiles, department tiles and the
//! alert feed. Every field is recomputed per request; nothing here is
//! persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Risk score at or above which a district is [`RiskLevel::Critical`].
pub const CRITICAL_THRESHOLD: f64 = 70.0;

/// Risk score at or above which a district is [`RiskLevel::High`].
pub const HIGH_THRESHOLD: f64 = 50.0;

/// Risk score at or above which a district is [`RiskLevel::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 30.0;

/// Lower bound of the risk scale.
pub const RISK_MIN: f64 = 0.0;

/// Upper bound of the risk scale.
pub const RISK_MAX: f64 = 100.0;

/// Risk bucket for a district or alert, ordered from most to least severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskLevel {
    /// Risk of 70 or more.
    Critical,
    /// Risk of 50 up to 70.
    High,
    /// Risk of 30 up to 50.
    Medium,
    /// Anything below 30.
    Low,
}

impl RiskLevel {
    /// Buckets a 0-100 risk score using the fixed thresholds.
    #[must_use]
    pub fn from_risk(risk: f64) -> Self {
        if risk >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if risk >= HIGH_THRESHOLD {
            Self::High
        } else if risk >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Returns `true` for the two levels that call for intervention.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Critical, Self::High, Self::Medium, Self::Low]
    }
}

/// One upstream subject area with its own independent scoring pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Domain {
    /// Real-time outbreak scoring.
    Health,
    /// Road repair batch scoring.
    Infrastructure,
    /// Police station crime scoring.
    PublicSafety,
    /// Citizen request volume and satisfaction forecasts.
    CitizenServicesFeedback,
}

impl Domain {
    /// Key of this domain's section under the payload's `pipelines` map.
    #[must_use]
    pub fn section_key(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Infrastructure => "infrastructure",
            Self::PublicSafety => "publicSafety",
            Self::CitizenServicesFeedback => "citizenServicesFeedback",
        }
    }

    /// The department tile fed by this domain.
    #[must_use]
    pub const fn department(self) -> Department {
        match self {
            Self::Health => Department::Health,
            Self::Infrastructure => Department::Infrastructure,
            Self::PublicSafety => Department::PublicSafety,
            Self::CitizenServicesFeedback => Department::CitizenServices,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Health,
            Self::Infrastructure,
            Self::PublicSafety,
            Self::CitizenServicesFeedback,
        ]
    }
}

/// A department shown as a tile on the dashboard.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Department {
    /// Health department.
    Health,
    /// Infrastructure (roads) department.
    Infrastructure,
    /// Police and public safety.
    PublicSafety,
    /// Citizen services and grievance handling.
    CitizenServices,
}

impl Department {
    /// Human-readable department name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Infrastructure => "Infrastructure",
            Self::PublicSafety => "Public Safety",
            Self::CitizenServices => "Citizen Services",
        }
    }

    /// Returns all variants of this enum, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Health,
            Self::Infrastructure,
            Self::PublicSafety,
            Self::CitizenServices,
        ]
    }
}

/// Fused risk entry for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictRisk {
    /// District name.
    pub district: String,
    /// Risk score in `[0, 100]`, `None` when neither reported nor imputable.
    pub risk: Option<f64>,
    /// Risk bucket, reported upstream or derived from `risk`.
    pub level: Option<RiskLevel>,
    /// Whether `risk` was filled in by the imputation model.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub imputed: bool,
}

/// Scalar shown on a KPI tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KpiValue {
    /// A plain count.
    Count(u64),
    /// Preformatted text (ratios, currency, placeholders).
    Text(String),
}

/// A display-ready headline KPI tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    /// Tile value.
    pub value: KpiValue,
    /// Upper-case tile caption.
    pub label: String,
    /// Icon name for the renderer.
    pub icon_hint: String,
    /// Color class for the renderer.
    pub color_hint: String,
}

/// The four headline KPI tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiData {
    /// Number of critical alerts in the feed.
    pub critical: Kpi,
    /// `"H/T"` high-risk district fraction.
    pub high_risk: Kpi,
    /// Affected population estimate.
    pub population: Kpi,
    /// Budget impact estimate.
    pub budget: Kpi,
}

/// One metric on a department tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentMetric {
    /// Metric caption.
    pub label: String,
    /// Formatted value, or the placeholder when no data contributed.
    pub value: String,
    /// Severity hint for risk-like metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RiskLevel>,
}

/// A qualitative factor driving a department's metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentFactor {
    /// Factor text as supplied by the upstream domain.
    pub name: String,
    /// Risk level of the district the factor comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RiskLevel>,
}

/// A department tile with its metrics and top factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTile {
    /// Which department this tile describes.
    pub id: Department,
    /// Display name.
    pub name: String,
    /// Metric tiles in display order.
    pub metrics: Vec<DepartmentMetric>,
    /// Most salient factors; empty when upstream supplied none.
    #[serde(default)]
    pub factors: Vec<DepartmentFactor>,
}

/// One entry of the alert feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertItem {
    /// Stable identifier.
    pub id: String,
    /// District the alert concerns.
    pub district: String,
    /// Alert severity.
    pub level: RiskLevel,
    /// Headline.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// What triggered the alert.
    pub trigger: String,
    /// Suggested actions.
    pub actions: Vec<String>,
    /// Alert timestamp (RFC 3339 when known).
    pub time: String,
    /// Whether the fusion engine generated this alert itself.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

/// The fully fused dashboard document.
///
/// Same top-level shape as the inbound payload, with every section
/// populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDocument {
    /// Headline KPI tiles.
    pub kpi_data: KpiData,
    /// Every referenced district keyed by name.
    pub district_risks: BTreeMap<String, DistrictRisk>,
    /// Alert feed.
    pub alerts: Vec<AlertItem>,
    /// Department tiles.
    pub departments: Vec<DepartmentTile>,
    /// Upstream pipeline sections, annotated with a `status`.
    pub pipelines: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn level_thresholds_are_inclusive() {
        assert_eq!(RiskLevel::from_risk(70.0), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_risk(69.99), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk(50.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk(30.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_risk(29.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk(100.0), RiskLevel::Critical);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!(RiskLevel::from_str("CRITICAL").unwrap(), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_str("High").unwrap(), RiskLevel::High);
        assert!(RiskLevel::from_str("severe").is_err());
        assert_eq!(RiskLevel::Medium.to_string(), "medium");
    }

    #[test]
    fn domain_section_keys_are_camel_case() {
        let keys: Vec<&str> = Domain::all().iter().map(|d| d.section_key()).collect();
        assert_eq!(
            keys,
            ["health", "infrastructure", "publicSafety", "citizenServicesFeedback"]
        );
        for domain in Domain::all() {
            assert_eq!(domain.to_string(), domain.section_key());
        }
    }

    #[test]
    fn kpi_value_serializes_untagged() {
        assert_eq!(serde_json::to_value(KpiValue::Count(3)).unwrap(), 3);
        assert_eq!(
            serde_json::to_value(KpiValue::Text("2/5".to_string())).unwrap(),
            "2/5"
        );
    }

    #[test]
    fn district_risk_omits_imputed_flag_when_reported() {
        let reported = DistrictRisk {
            district: "Pune".to_string(),
            risk: Some(42.0),
            level: Some(RiskLevel::Medium),
            imputed: false,
        };
        let json = serde_json::to_value(&reported).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "district": "Pune", "risk": 42.0, "level": "medium" })
        );
    }

    #[test]
    fn department_tile_deserializes_without_factors() {
        let tile: DepartmentTile = serde_json::from_value(serde_json::json!({
            "id": "publicSafety",
            "name": "Public Safety",
            "metrics": [{ "label": "Crime Risk", "value": "41.0%", "status": "medium" }]
        }))
        .unwrap();
        assert_eq!(tile.id, Department::PublicSafety);
        assert!(tile.factors.is_empty());
        assert_eq!(tile.metrics[0].status, Some(RiskLevel::Medium));
    }
}
