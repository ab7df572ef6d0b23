//! Feature vectors for the risk imputer.
//!
//! One fixed slot per indicator across every domain. Indicators a domain
//! did not report are zero-filled so every district has a vector of the
//! same length.

use crate::extract::{CitizenServicesSignal, FusedSignals};

/// Number of indicators in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 11;

/// Indicator names in slot order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "infra_backlog_cr",
    "infra_avg_impact",
    "infra_critical_roads",
    "safety_crime_risk_pct",
    "safety_response_efficiency_pct",
    "safety_resolution_pct",
    "safety_hotspots",
    "services_requests_7d",
    "services_backlog_eta_days",
    "services_satisfaction",
    "health_outbreak_risk_pct",
];

/// Fixed-order indicator tuple for one district.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Builds the feature vector for `district`.
#[must_use]
pub fn build_feature_vector(signals: &FusedSignals, district: &str) -> FeatureVector {
    let infra = signals.infrastructure.get(district);
    let safety = signals.public_safety.get(district);
    let services = signals.citizen_services.get(district);
    let health = signals.health.get(district);

    [
        infra.and_then(|s| s.backlog_cr),
        infra.and_then(|s| s.avg_impact),
        infra.and_then(|s| s.critical_roads),
        safety.and_then(|s| s.crime_risk_pct),
        safety.and_then(|s| s.response_efficiency_pct),
        safety.and_then(|s| s.resolution_pct),
        safety.and_then(|s| s.hotspots),
        services.and_then(CitizenServicesSignal::requests_7d),
        services.and_then(|s| s.backlog_eta_days),
        services.and_then(|s| s.satisfaction),
        health.and_then(|s| s.outbreak_risk_pct),
    ]
    .map(|slot| slot.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::extract::extract;

    #[test]
    fn fills_slots_in_fixed_order() {
        let signals = extract(&json!({
            "pipelines": {
                "infrastructure": { "data": { "X": { "backlog_cr": 40, "avg_impact": 6, "critical_roads_count": 3 } } },
                "publicSafety": { "data": { "dashboard": { "X": { "metrics": [50, 60, 70], "hotspots": 2 } } } },
                "citizenServicesFeedback": { "data": { "dashboard": { "X": { "metrics": [10, 2.5, 8] } } } },
                "health": { "data": [{ "district": "X", "raw_score": 0.3 }] }
            }
        }));
        let vector = build_feature_vector(&signals, "X");
        let expected = [40.0, 6.0, 3.0, 50.0, 60.0, 70.0, 2.0, 70.0, 2.5, 8.0, 30.0];
        for (slot, (got, want)) in vector.iter().zip(expected).enumerate() {
            assert!((got - want).abs() < 1e-9, "{}: {got} != {want}", FEATURE_NAMES[slot]);
        }
    }

    #[test]
    fn absent_domains_are_zero_filled() {
        let signals = extract(&json!({
            "pipelines": { "infrastructure": { "data": { "X": { "backlog_cr": 12 } } } }
        }));
        let vector = build_feature_vector(&signals, "X");
        assert!((vector[0] - 12.0).abs() < f64::EPSILON);
        assert!(vector[1..].iter().all(|v| *v == 0.0));
        assert_eq!(build_feature_vector(&signals, "unknown"), [0.0; FEATURE_COUNT]);
    }

    #[test]
    fn is_deterministic() {
        let payload = json!({
            "pipelines": { "publicSafety": { "data": { "Y": { "metrics": [1.5, 2.5, 3.5] } } } }
        });
        let a = build_feature_vector(&extract(&payload), "Y");
        let b = build_feature_vector(&extract(&payload), "Y");
        assert_eq!(a, b);
    }
}
