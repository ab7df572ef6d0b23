//! Signal extraction: normalizes each upstream domain section into
//! per-district indicator records.
//!
//! Upstream pipelines do not share a schema. Each extractor understands
//! exactly one domain's shape and degrades to [`DomainSection::Absent`] or
//! [`DomainSection::Unusable`] instead of failing, so one bad section never
//! aborts the fusion.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr as _;

use risk_fusion_models::{AlertItem, Domain, RISK_MAX, RISK_MIN, RiskLevel};
use serde_json::{Map, Value};

use crate::numeric::{
    embedded_percent, factor_field, finite_number, first_number_field, indexed_number,
    number_field, text_field,
};

/// District recorded on an upstream alert that names none.
pub const UNKNOWN_DISTRICT: &str = "Unknown";

/// Extraction outcome for one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainSection<T> {
    /// The payload has no section for this domain.
    Absent,
    /// The section exists but yielded no usable district records.
    Unusable,
    /// Normalized records keyed by district; never empty.
    Present(BTreeMap<String, T>),
}

impl<T> DomainSection<T> {
    fn from_records(records: BTreeMap<String, T>) -> Self {
        if records.is_empty() {
            Self::Unusable
        } else {
            Self::Present(records)
        }
    }

    /// Returns the record for `district`, if this domain reported one.
    #[must_use]
    pub fn get(&self, district: &str) -> Option<&T> {
        match self {
            Self::Present(records) => records.get(district),
            Self::Absent | Self::Unusable => None,
        }
    }

    /// Iterates over all records in district order.
    pub fn records(&self) -> impl Iterator<Item = (&String, &T)> {
        let map = match self {
            Self::Present(records) => Some(records),
            Self::Absent | Self::Unusable => None,
        };
        map.into_iter().flatten()
    }

    /// Returns `true` when the payload had no section for this domain.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Pipeline status for the outbound document (`None` when absent).
    #[must_use]
    pub const fn status(&self) -> Option<&'static str> {
        match self {
            Self::Absent => None,
            Self::Unusable => Some("empty"),
            Self::Present(_) => Some("ok"),
        }
    }
}

/// Per-district health indicators from the outbreak scorer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthSignal {
    /// Highest outbreak risk reported for the district (0-100).
    pub outbreak_risk_pct: Option<f64>,
    /// Daily patient inflow, summed over events.
    pub patient_load: Option<f64>,
    /// Trigger text of the highest-risk event.
    pub top_trigger: Option<String>,
}

/// Per-district road infrastructure indicators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfraSignal {
    /// Risk label reported by the infrastructure scorer.
    pub reported_risk: Option<f64>,
    /// Level reported alongside `reported_risk`.
    pub reported_level: Option<RiskLevel>,
    /// Expected repair backlog in crore.
    pub backlog_cr: Option<f64>,
    /// Average traffic impact score (0-100).
    pub avg_impact: Option<f64>,
    /// Number of roads flagged critical.
    pub critical_roads: Option<f64>,
    /// Most urgent road line.
    pub top_factor: Option<String>,
}

/// Per-district public-safety indicators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetySignal {
    /// Average crime risk (0-100).
    pub crime_risk_pct: Option<f64>,
    /// Response efficiency percentage.
    pub response_efficiency_pct: Option<f64>,
    /// Case resolution percentage.
    pub resolution_pct: Option<f64>,
    /// Number of hotspot stations.
    pub hotspots: Option<f64>,
    /// Riskiest station line.
    pub top_factor: Option<String>,
}

/// Per-district citizen-services indicators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitizenServicesSignal {
    /// Forecast requests per day over the next week.
    pub requests_per_day: Option<f64>,
    /// Days to clear the open backlog.
    pub backlog_eta_days: Option<f64>,
    /// Expected satisfaction (0-10).
    pub satisfaction: Option<f64>,
    /// Expected SLA breach rate percentage.
    pub sla_breach_pct: Option<f64>,
    /// Open requests at end of day.
    pub pending: Option<f64>,
    /// Demand spike line for the busiest service.
    pub top_factor: Option<String>,
}

impl CitizenServicesSignal {
    /// Forecast request volume over seven days.
    #[must_use]
    pub fn requests_7d(&self) -> Option<f64> {
        self.requests_per_day.map(|per_day| per_day * 7.0)
    }
}

/// A risk score reported directly in the payload's `districtRisks` section.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportedRisk {
    /// Reported score, clamped to the risk scale.
    pub risk: Option<f64>,
    /// Reported level.
    pub level: Option<RiskLevel>,
}

/// Everything the extractor could recover from one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedSignals {
    /// Entries from `districtRisks`.
    pub reported: BTreeMap<String, ReportedRisk>,
    /// Entries from the top-level `alerts` feed.
    pub alerts: Vec<AlertItem>,
    /// Inbound `departments` records, flattened to objects.
    pub departments: Vec<Map<String, Value>>,
    /// Outbreak events parsed as alerts.
    pub health_events: Vec<AlertItem>,
    /// Health domain.
    pub health: DomainSection<HealthSignal>,
    /// Infrastructure domain.
    pub infrastructure: DomainSection<InfraSignal>,
    /// Public-safety domain.
    pub public_safety: DomainSection<SafetySignal>,
    /// Citizen-services domain.
    pub citizen_services: DomainSection<CitizenServicesSignal>,
}

impl FusedSignals {
    /// Every district referenced anywhere in the payload: `districtRisks`,
    /// the four domains, the upstream alert feed and `departments` records.
    #[must_use]
    pub fn districts(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.reported.keys().cloned().collect();
        out.extend(self.health.records().map(|(d, _)| d.clone()));
        out.extend(self.infrastructure.records().map(|(d, _)| d.clone()));
        out.extend(self.public_safety.records().map(|(d, _)| d.clone()));
        out.extend(self.citizen_services.records().map(|(d, _)| d.clone()));
        out.extend(
            self.alerts
                .iter()
                .filter(|a| a.district != UNKNOWN_DISTRICT)
                .map(|a| a.district.clone()),
        );
        out.extend(
            self.departments
                .iter()
                .filter_map(|record| record.get("district").and_then(Value::as_str))
                .filter_map(normalize_district),
        );
        out
    }

    /// Directly reported risk: `districtRisks` first, then the
    /// infrastructure scorer's own label.
    #[must_use]
    pub fn reported_risk(&self, district: &str) -> Option<f64> {
        self.reported
            .get(district)
            .and_then(|r| r.risk)
            .or_else(|| {
                self.infrastructure
                    .get(district)
                    .and_then(|s| s.reported_risk)
            })
    }

    /// Directly reported level, in the same precedence as
    /// [`Self::reported_risk`].
    #[must_use]
    pub fn reported_level(&self, district: &str) -> Option<RiskLevel> {
        match self.reported.get(district) {
            Some(r) if r.risk.is_some() || r.level.is_some() => r.level,
            _ => self
                .infrastructure
                .get(district)
                .and_then(|s| s.reported_level),
        }
    }

    /// The most specific qualitative factor any domain gave for `district`.
    #[must_use]
    pub fn top_factor(&self, district: &str) -> Option<&str> {
        self.infrastructure
            .get(district)
            .and_then(|s| s.top_factor.as_deref())
            .or_else(|| {
                self.public_safety
                    .get(district)
                    .and_then(|s| s.top_factor.as_deref())
            })
            .or_else(|| {
                self.citizen_services
                    .get(district)
                    .and_then(|s| s.top_factor.as_deref())
            })
            .or_else(|| {
                self.health
                    .get(district)
                    .and_then(|s| s.top_trigger.as_deref())
            })
    }

    /// Outbound pipeline status for `domain`.
    #[must_use]
    pub const fn section_status(&self, domain: Domain) -> Option<&'static str> {
        match domain {
            Domain::Health => self.health.status(),
            Domain::Infrastructure => self.infrastructure.status(),
            Domain::PublicSafety => self.public_safety.status(),
            Domain::CitizenServicesFeedback => self.citizen_services.status(),
        }
    }

    /// Whether the payload had no section at all for `domain`.
    #[must_use]
    pub const fn is_absent(&self, domain: Domain) -> bool {
        match domain {
            Domain::Health => self.health.is_absent(),
            Domain::Infrastructure => self.infrastructure.is_absent(),
            Domain::PublicSafety => self.public_safety.is_absent(),
            Domain::CitizenServicesFeedback => self.citizen_services.is_absent(),
        }
    }
}

/// Extracts every section of an inbound payload.
///
/// Never fails: a payload that is not an object simply yields no signals.
#[must_use]
pub fn extract(payload: &Value) -> FusedSignals {
    let pipelines = payload.get("pipelines").filter(|p| p.is_object());

    let (health, health_events) = match section_data(pipelines, Domain::Health) {
        Some(data) => extract_health(data),
        None => (DomainSection::Absent, Vec::new()),
    };

    let signals = FusedSignals {
        reported: payload
            .get("districtRisks")
            .map(extract_reported)
            .unwrap_or_default(),
        alerts: payload
            .get("alerts")
            .map(|a| parse_alerts(a, "alert"))
            .unwrap_or_default(),
        departments: payload
            .get("departments")
            .map(normalize_departments)
            .unwrap_or_default(),
        health_events,
        health,
        infrastructure: section_data(pipelines, Domain::Infrastructure)
            .map_or(DomainSection::Absent, extract_infrastructure),
        public_safety: section_data(pipelines, Domain::PublicSafety)
            .map_or(DomainSection::Absent, extract_public_safety),
        citizen_services: section_data(pipelines, Domain::CitizenServicesFeedback)
            .map_or(DomainSection::Absent, extract_citizen_services),
    };

    for domain in Domain::all() {
        if signals.section_status(*domain) == Some("empty") {
            log::debug!("Pipeline section '{domain}' present but unusable; treating as empty");
        }
    }

    signals
}

/// Returns the `data` of a domain section, or the section itself when it
/// carries no `data` wrapper.
fn section_data(pipelines: Option<&Value>, domain: Domain) -> Option<&Value> {
    let section = pipelines?.get(domain.section_key())?;
    if section.is_null() {
        return None;
    }
    Some(section.get("data").unwrap_or(section))
}

fn normalize_district(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clamp_risk(risk: f64) -> f64 {
    risk.clamp(RISK_MIN, RISK_MAX)
}

fn parse_level(record: &Value) -> Option<RiskLevel> {
    text_field(record, "level").and_then(|s| RiskLevel::from_str(s).ok())
}

/// Applies `parse` to every object value of a district-keyed map.
fn district_records<T>(data: &Value, parse: impl Fn(&Value) -> T) -> BTreeMap<String, T> {
    data.as_object()
        .into_iter()
        .flatten()
        .filter(|(_, record)| record.is_object())
        .filter_map(|(key, record)| normalize_district(key).map(|d| (d, parse(record))))
        .collect()
}

fn extract_reported(section: &Value) -> BTreeMap<String, ReportedRisk> {
    district_records(section, |record| ReportedRisk {
        risk: number_field(record, "risk").map(clamp_risk),
        level: parse_level(record),
    })
}

fn extract_infrastructure(data: &Value) -> DomainSection<InfraSignal> {
    DomainSection::from_records(district_records(data, |record| {
        let metrics = record.get("metrics");
        InfraSignal {
            reported_risk: number_field(record, "risk")
                .or_else(|| indexed_number(metrics, 0))
                .map(clamp_risk),
            reported_level: parse_level(record),
            backlog_cr: number_field(record, "backlog_cr").or_else(|| indexed_number(metrics, 1)),
            avg_impact: number_field(record, "avg_impact").or_else(|| indexed_number(metrics, 2)),
            critical_roads: first_number_field(record, &["critical_roads_count", "critical_roads"]),
            top_factor: factor_field(record, &["top_factor", "top_factor_line"]),
        }
    }))
}

/// Picks the per-district map out of a `{ dashboard, <other> }` wrapper,
/// or uses `data` directly when it has no wrapper.
fn dashboard_map<'a>(data: &'a Value, sibling: &str) -> Option<&'a Value> {
    match data.get("dashboard") {
        Some(dashboard) => Some(dashboard),
        None if data.get(sibling).is_none() => Some(data),
        None => None,
    }
}

fn extract_public_safety(data: &Value) -> DomainSection<SafetySignal> {
    let Some(dashboard) = dashboard_map(data, "scores") else {
        return DomainSection::Unusable;
    };
    DomainSection::from_records(district_records(dashboard, |record| {
        let metrics = record.get("metrics");
        SafetySignal {
            crime_risk_pct: indexed_number(metrics, 0).or_else(|| number_field(record, "crime_risk")),
            response_efficiency_pct: indexed_number(metrics, 1)
                .or_else(|| number_field(record, "response_efficiency")),
            resolution_pct: indexed_number(metrics, 2)
                .or_else(|| number_field(record, "resolution_rate")),
            hotspots: number_field(record, "hotspots"),
            top_factor: factor_field(record, &["top_factor_line", "top_factor"]),
        }
    }))
}

fn extract_citizen_services(data: &Value) -> DomainSection<CitizenServicesSignal> {
    let Some(dashboard) = dashboard_map(data, "forecasts") else {
        return DomainSection::Unusable;
    };
    DomainSection::from_records(district_records(dashboard, |record| {
        let metrics = record.get("metrics");
        CitizenServicesSignal {
            requests_per_day: indexed_number(metrics, 0),
            backlog_eta_days: indexed_number(metrics, 1),
            satisfaction: indexed_number(metrics, 2),
            sla_breach_pct: indexed_number(metrics, 3),
            pending: number_field(record, "pending"),
            top_factor: record
                .get("alert")
                .and_then(|alert| factor_field(alert, &["description"]))
                .or_else(|| factor_field(record, &["top_factor_line", "top_factor"])),
        }
    }))
}

/// Outbreak risk of one health event as a percentage.
fn event_risk_pct(event: &Value) -> Option<f64> {
    number_field(event, "raw_score")
        .map(|score| score * 100.0)
        .or_else(|| text_field(event, "title").and_then(embedded_percent))
        .map(clamp_risk)
}

fn extract_health(data: &Value) -> (DomainSection<HealthSignal>, Vec<AlertItem>) {
    let Some(events) = data.as_array() else {
        return (DomainSection::Unusable, Vec::new());
    };

    let mut records: BTreeMap<String, HealthSignal> = BTreeMap::new();
    for event in events.iter().filter(|e| e.is_object()) {
        let Some(district) = text_field(event, "district").and_then(normalize_district) else {
            continue;
        };
        let entry = records.entry(district).or_default();

        let risk = event_risk_pct(event);
        if let Some(risk) = risk
            && entry.outbreak_risk_pct.is_none_or(|best| risk > best)
        {
            entry.outbreak_risk_pct = Some(risk);
            if let Some(trigger) = factor_field(event, &["trigger"]) {
                entry.top_trigger = Some(trigger);
            }
        } else if entry.top_trigger.is_none() {
            entry.top_trigger = factor_field(event, &["trigger"]);
        }

        let inflow = event
            .get("input_features")
            .and_then(|f| number_field(f, "patient_inflow_mean"))
            .or_else(|| number_field(event, "patient_inflow_mean"));
        if let Some(inflow) = inflow {
            entry.patient_load = Some(entry.patient_load.unwrap_or(0.0) + inflow);
        }
    }

    (
        DomainSection::from_records(records),
        parse_alerts(data, "health"),
    )
}

/// Parses an alert array, dropping entries that are not objects.
fn parse_alerts(value: &Value, id_prefix: &str) -> Vec<AlertItem> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, item)| parse_alert(item, &format!("{id_prefix}-{index}")))
        .collect()
}

/// Parses one upstream alert, filling absent fields with neutral values.
fn parse_alert(item: &Value, fallback_id: &str) -> Option<AlertItem> {
    if !item.is_object() {
        return None;
    }

    let id = match item.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => fallback_id.to_string(),
    };

    let level = parse_level(item)
        .or_else(|| event_risk_pct(item).map(RiskLevel::from_risk))
        .unwrap_or(RiskLevel::Low);

    let actions = item
        .get("actions")
        .and_then(Value::as_array)
        .map(|actions| {
            actions
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(AlertItem {
        id,
        district: text_field(item, "district").unwrap_or(UNKNOWN_DISTRICT).to_string(),
        level,
        title: text_field(item, "title").unwrap_or("Alert").to_string(),
        description: text_field(item, "description").unwrap_or_default().to_string(),
        trigger: text_field(item, "trigger").unwrap_or_default().to_string(),
        actions,
        time: item.get("time").map(parse_time).unwrap_or_default(),
        synthetic: false,
    })
}

/// Normalizes an alert timestamp to text.
///
/// Strings pass through; epoch seconds (bare or as a `{ seconds }` /
/// `{ _seconds }` object) are rendered as RFC 3339.
#[allow(clippy::cast_possible_truncation)]
fn parse_time(value: &Value) -> String {
    let epoch = match value {
        Value::String(s) => return s.trim().to_string(),
        Value::Number(_) => finite_number(value),
        Value::Object(_) => first_number_field(value, &["seconds", "_seconds"]),
        _ => None,
    };
    epoch
        .and_then(|secs| chrono::DateTime::from_timestamp(secs as i64, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// Flattens the inbound `departments` section to a list of objects.
///
/// A list passes through (scalars wrapped as `{ value }`); a map keyed by
/// district becomes one record per district carrying a `district` key.
fn normalize_departments(raw: &Value) -> Vec<Map<String, Value>> {
    let wrap = |value: &Value| {
        let mut record = Map::new();
        record.insert("value".to_string(), value.clone());
        record
    };

    match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_object().cloned().unwrap_or_else(|| wrap(item)))
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(district, value)| {
                let mut record = value.as_object().cloned().unwrap_or_else(|| wrap(value));
                record.insert("district".to_string(), Value::String(district.clone()));
                record
            })
            .collect(),
        _ => Vec::new(),
    }
}
