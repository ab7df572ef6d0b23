//! Alert feed fusion.
//!
//! The dashboard shows the upstream alert feed when there is one, the
//! health pipeline's outbreak events otherwise, and as a last resort a
//! feed synthesized from the highest-risk districts.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use risk_fusion_models::{AlertItem, DistrictRisk, RiskLevel};

use crate::extract::FusedSignals;

/// Trigger used when no domain supplied a factor for the district.
pub const GENERIC_TRIGGER: &str = "Composite cross-domain risk";

/// Picks the alert feed for the fused document.
#[must_use]
pub fn fuse_alerts(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<AlertItem> {
    if !signals.alerts.is_empty() {
        return signals.alerts.clone();
    }
    if !signals.health_events.is_empty() {
        log::debug!(
            "No upstream alerts; using {} health events",
            signals.health_events.len()
        );
        return signals.health_events.clone();
    }

    let synthesized = synthesize_alerts(signals, risks, limit, now);
    if !synthesized.is_empty() {
        log::info!("Synthesized {} alerts from district risks", synthesized.len());
    }
    synthesized
}

/// Builds one alert per district for the `limit` highest-risk districts,
/// ordered by descending risk with ties broken by district name.
///
/// Districts without a risk are skipped.
#[must_use]
pub fn synthesize_alerts(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<AlertItem> {
    let mut ranked: Vec<(&str, f64)> = risks
        .values()
        .filter_map(|entry| entry.risk.map(|risk| (entry.district.as_str(), risk)))
        .collect();
    ranked.sort_by(|(a_name, a_risk), (b_name, b_risk)| {
        b_risk.total_cmp(a_risk).then_with(|| a_name.cmp(b_name))
    });

    let time = now.to_rfc3339_opts(SecondsFormat::Secs, true);

    ranked
        .into_iter()
        .take(limit)
        .map(|(district, risk)| {
            let level = RiskLevel::from_risk(risk);
            AlertItem {
                id: format!("synthetic-{}", slug(district)),
                district: district.to_string(),
                level,
                title: format!("District Risk: {risk:.0}%"),
                description: format!("{district} is at {level} risk ({risk:.1}/100) across domains"),
                trigger: signals
                    .top_factor(district)
                    .unwrap_or(GENERIC_TRIGGER)
                    .to_string(),
                actions: actions_for(level),
                time: time.clone(),
                synthetic: true,
            }
        })
        .collect()
}

fn actions_for(level: RiskLevel) -> Vec<String> {
    let actions: &[&str] = if level.is_elevated() {
        &["Deploy Response Teams", "Escalate to District Office"]
    } else {
        &["Monitor"]
    };
    actions.iter().map(ToString::to_string).collect()
}

/// Lower-case ASCII slug: alphanumeric runs joined by single dashes.
fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
