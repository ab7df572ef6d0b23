//! KPI and department tile derivation.
//!
//! Tiles are computed either for one selected district or across every
//! district. Across districts, scores and percentages are averaged and
//! volumes and counts are summed. A metric no record contributed to shows
//! [`PLACEHOLDER`] instead of zero.

use std::collections::BTreeMap;
use std::str::FromStr as _;

use risk_fusion_models::{
    AlertItem, Department, DepartmentFactor, DepartmentMetric, DepartmentTile, DistrictRisk,
    Domain, HIGH_THRESHOLD, Kpi, KpiData, KpiValue, RISK_MAX, RiskLevel,
};
use serde_json::{Map, Value};

use crate::config::FusionConfig;
use crate::extract::{DomainSection, FusedSignals};
use crate::numeric::{finite_number, mean, total, with_thousands};

/// Text shown for a value that could not be computed.
pub const PLACEHOLDER: &str = "Not available";

/// Derives the four headline KPI tiles.
///
/// `alerts` is the fused feed and `risks` the fused district map, so the
/// counts reflect synthesized alerts and imputed risks.
#[must_use]
pub fn derive_kpis(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    alerts: &[AlertItem],
    config: &FusionConfig,
    district: Option<&str>,
) -> KpiData {
    let in_scope = |name: &str| district.is_none_or(|selected| selected == name);

    let critical = alerts
        .iter()
        .filter(|alert| alert.level == RiskLevel::Critical && in_scope(alert.district.as_str()))
        .count();

    let scoped_risks: Vec<&DistrictRisk> = risks
        .values()
        .filter(|entry| in_scope(entry.district.as_str()))
        .collect();
    let high_risk = scoped_risks
        .iter()
        .filter(|entry| entry.risk.is_some_and(|risk| risk >= HIGH_THRESHOLD))
        .count();

    let records: Vec<&Map<String, Value>> = signals
        .departments
        .iter()
        .filter(|record| record_in_scope(record, district))
        .collect();

    let population = config.population_override.clone().or_else(|| {
        total(records.iter().filter_map(|r| record_number(r, &["pending"])))
            .or_else(|| {
                total(
                    scoped(&signals.citizen_services, district)
                        .filter_map(|(_, s)| s.pending),
                )
            })
            .map(|sum| with_thousands(sum.trunc(), 0))
    });

    let budget = config.budget_override.clone().or_else(|| {
        total(
            records
                .iter()
                .filter_map(|r| record_number(r, &["budget", "budget_utilized_cr"])),
        )
        .map(format_crore)
    });

    KpiData {
        critical: kpi(
            KpiValue::Count(u64::try_from(critical).unwrap_or(u64::MAX)),
            "CRITICAL ALERTS",
            "AlertCircle",
            "text-destructive",
        ),
        high_risk: kpi(
            KpiValue::Text(format!("{high_risk}/{}", scoped_risks.len().max(1))),
            "HIGH RISK DISTRICTS",
            "TrendingUp",
            "text-orange-500",
        ),
        population: kpi(
            KpiValue::Text(population.unwrap_or_else(|| PLACEHOLDER.to_string())),
            "AFFECTED POPULATION",
            "Users",
            "text-blue-500",
        ),
        budget: kpi(
            KpiValue::Text(budget.unwrap_or_else(|| PLACEHOLDER.to_string())),
            "BUDGET IMPACT",
            "Wallet",
            "text-emerald-500",
        ),
    }
}

fn kpi(value: KpiValue, label: &str, icon: &str, color: &str) -> Kpi {
    Kpi {
        value,
        label: label.to_string(),
        icon_hint: icon.to_string(),
        color_hint: color.to_string(),
    }
}

fn record_in_scope(record: &Map<String, Value>, district: Option<&str>) -> bool {
    match (district, record.get("district").and_then(Value::as_str)) {
        (Some(selected), Some(name)) => name.trim() == selected,
        _ => true,
    }
}

fn record_number(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(finite_number))
}

/// `₹<amount> Cr` with at most two decimals.
fn format_crore(amount: f64) -> String {
    let text = with_thousands(amount, 2);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("₹{text} Cr")
}

fn scoped<'a, T>(
    section: &'a DomainSection<T>,
    district: Option<&'a str>,
) -> impl Iterator<Item = (&'a str, &'a T)> {
    section
        .records()
        .map(|(name, record)| (name.as_str(), record))
        .filter(move |(name, _)| district.is_none_or(|selected| selected == *name))
}

/// Derives one tile per department, in display order.
///
/// A department whose domain is missing from `pipelines` reuses a tile
/// supplied in the inbound `departments` section when there is one.
#[must_use]
pub fn derive_departments(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    district: Option<&str>,
) -> Vec<DepartmentTile> {
    Domain::all()
        .iter()
        .map(|&domain| {
            let department = domain.department();
            if signals.is_absent(domain)
                && let Some(tile) = inbound_tile(signals, department, district)
            {
                return tile;
            }
            let (metrics, factors) = match domain {
                Domain::Health => health_tile(signals, risks, district),
                Domain::Infrastructure => infrastructure_tile(signals, risks, district),
                Domain::PublicSafety => public_safety_tile(signals, risks, district),
                Domain::CitizenServicesFeedback => citizen_services_tile(signals, risks, district),
            };
            DepartmentTile {
                id: department,
                name: department.display_name().to_string(),
                metrics,
                factors,
            }
        })
        .collect()
}

fn inbound_tile(
    signals: &FusedSignals,
    department: Department,
    district: Option<&str>,
) -> Option<DepartmentTile> {
    signals
        .departments
        .iter()
        .filter(|record| record_in_scope(record, district))
        .filter(|record| {
            record
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| Department::from_str(id).ok())
                == Some(department)
        })
        .find_map(|record| serde_json::from_value(Value::Object(record.clone())).ok())
}

type TileParts = (Vec<DepartmentMetric>, Vec<DepartmentFactor>);

fn health_tile(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    district: Option<&str>,
) -> TileParts {
    let records: Vec<_> = scoped(&signals.health, district).collect();
    let metrics = vec![
        risk_metric(
            "Outbreak Risk",
            mean(records.iter().filter_map(|(_, s)| s.outbreak_risk_pct)),
        ),
        metric(
            "Patient Load",
            total(records.iter().filter_map(|(_, s)| s.patient_load)),
            |v| format!("{}/day", with_thousands(v, 0)),
        ),
    ];
    let factors = top_factor(&records, risks, |s| s.top_trigger.as_deref());
    (metrics, factors)
}

fn infrastructure_tile(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    district: Option<&str>,
) -> TileParts {
    let records: Vec<_> = scoped(&signals.infrastructure, district).collect();
    let metrics = vec![
        metric(
            "Condition Score",
            mean(records.iter().filter_map(|(_, s)| s.reported_risk)).map(|risk| RISK_MAX - risk),
            |v| format!("{v:.0}/100"),
        ),
        metric(
            "Repair Backlog",
            total(records.iter().filter_map(|(_, s)| s.backlog_cr)),
            format_crore,
        ),
        metric(
            "Critical Roads",
            total(records.iter().filter_map(|(_, s)| s.critical_roads)),
            |v| with_thousands(v, 0),
        ),
    ];
    let factors = top_factor(&records, risks, |s| s.top_factor.as_deref());
    (metrics, factors)
}

fn public_safety_tile(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    district: Option<&str>,
) -> TileParts {
    let records: Vec<_> = scoped(&signals.public_safety, district).collect();
    let metrics = vec![
        risk_metric(
            "Crime Risk",
            mean(records.iter().filter_map(|(_, s)| s.crime_risk_pct)),
        ),
        metric(
            "Response Efficiency",
            mean(records.iter().filter_map(|(_, s)| s.response_efficiency_pct)),
            percent,
        ),
        metric(
            "Resolution Rate",
            mean(records.iter().filter_map(|(_, s)| s.resolution_pct)),
            percent,
        ),
        metric(
            "Hotspots",
            total(records.iter().filter_map(|(_, s)| s.hotspots)),
            |v| with_thousands(v, 0),
        ),
    ];
    let factors = top_factor(&records, risks, |s| s.top_factor.as_deref());
    (metrics, factors)
}

fn citizen_services_tile(
    signals: &FusedSignals,
    risks: &BTreeMap<String, DistrictRisk>,
    district: Option<&str>,
) -> TileParts {
    let records: Vec<_> = scoped(&signals.citizen_services, district).collect();
    let metrics = vec![
        metric(
            "Requests (7d)",
            total(records.iter().filter_map(|(_, s)| s.requests_7d())),
            |v| with_thousands(v, 0),
        ),
        metric(
            "Backlog ETA",
            mean(records.iter().filter_map(|(_, s)| s.backlog_eta_days)),
            |v| format!("{v:.1} days"),
        ),
        metric(
            "Satisfaction",
            mean(records.iter().filter_map(|(_, s)| s.satisfaction)),
            |v| format!("{v:.1}/10"),
        ),
        metric(
            "Pending",
            total(records.iter().filter_map(|(_, s)| s.pending)),
            |v| with_thousands(v, 0),
        ),
    ];
    let factors = top_factor(&records, risks, |s| s.top_factor.as_deref());
    (metrics, factors)
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn metric(label: &str, value: Option<f64>, format: impl Fn(f64) -> String) -> DepartmentMetric {
    DepartmentMetric {
        label: label.to_string(),
        value: value.map_or_else(|| PLACEHOLDER.to_string(), format),
        status: None,
    }
}

fn risk_metric(label: &str, value: Option<f64>) -> DepartmentMetric {
    DepartmentMetric {
        status: value.map(RiskLevel::from_risk),
        ..metric(label, value, percent)
    }
}

/// Factor of the highest-risk district that has one; ties go to the
/// alphabetically first district.
fn top_factor<T>(
    records: &[(&str, &T)],
    risks: &BTreeMap<String, DistrictRisk>,
    factor: impl Fn(&T) -> Option<&str>,
) -> Vec<DepartmentFactor> {
    let risk_of = |name: &str| {
        risks
            .get(name)
            .and_then(|entry| entry.risk)
            .unwrap_or(f64::NEG_INFINITY)
    };

    records
        .iter()
        .filter_map(|(name, record)| factor(*record).map(|text| (*name, text)))
        .max_by(|(a, _), (b, _)| risk_of(*a).total_cmp(&risk_of(*b)).then_with(|| b.cmp(a)))
        .map(|(name, text)| DepartmentFactor {
            name: text.to_string(),
            status: risks.get(name).and_then(|entry| entry.level),
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::extract::extract;

    fn payload() -> Value {
        json!({
            "departments": [
                { "district": "Pune", "pending": 1200, "budget": 10.5 },
                { "district": "Nagpur", "pending": 800, "budget_utilized_cr": 4.5 }
            ],
            "pipelines": {
                "health": { "data": [
                    { "district": "Pune", "raw_score": 0.8, "trigger": "PM2.5: 140",
                      "input_features": { "patient_inflow_mean": 90 } },
                    { "district": "Nagpur", "raw_score": 0.4, "trigger": "Water Quality: 52",
                      "input_features": { "patient_inflow_mean": 30 } }
                ] },
                "publicSafety": { "data": { "dashboard": {
                    "Pune": { "metrics": [60, 70, 50], "hotspots": 2, "top_factor_line": "Station 4 (Risk: 81%)" },
                    "Nagpur": { "metrics": [40, 80, 60], "hotspots": 1, "top_factor_line": "—" }
                }, "scores": [] } }
            }
        })
    }

    fn risks(entries: &[(&str, f64)]) -> BTreeMap<String, DistrictRisk> {
        entries
            .iter()
            .map(|(name, risk)| {
                (
                    (*name).to_string(),
                    DistrictRisk {
                        district: (*name).to_string(),
                        risk: Some(*risk),
                        level: Some(RiskLevel::from_risk(*risk)),
                        imputed: false,
                    },
                )
            })
            .collect()
    }

    fn metric_value<'a>(tile: &'a DepartmentTile, label: &str) -> &'a str {
        &tile
            .metrics
            .iter()
            .find(|m| m.label == label)
            .unwrap()
            .value
    }

    fn alert(district: &str, level: RiskLevel) -> AlertItem {
        AlertItem {
            id: district.to_string(),
            district: district.to_string(),
            level,
            title: String::new(),
            description: String::new(),
            trigger: String::new(),
            actions: vec![],
            time: String::new(),
            synthetic: false,
        }
    }

    #[test]
    fn aggregates_across_districts() {
        let signals = extract(&payload());
        let tiles = derive_departments(&signals, &risks(&[("Pune", 72.0), ("Nagpur", 41.0)]), None);
        let ids: Vec<Department> = tiles.iter().map(|t| t.id).collect();
        assert_eq!(ids, Department::all());

        let health = &tiles[0];
        assert_eq!(metric_value(health, "Outbreak Risk"), "60.0%");
        assert_eq!(health.metrics[0].status, Some(RiskLevel::High));
        assert_eq!(metric_value(health, "Patient Load"), "120/day");
        assert_eq!(health.factors[0].name, "PM2.5: 140");
        assert_eq!(health.factors[0].status, Some(RiskLevel::Critical));

        let safety = &tiles[2];
        assert_eq!(metric_value(safety, "Crime Risk"), "50.0%");
        assert_eq!(metric_value(safety, "Response Efficiency"), "75.0%");
        assert_eq!(metric_value(safety, "Hotspots"), "3");
        assert_eq!(safety.factors.len(), 1);
    }

    #[test]
    fn scopes_to_selected_district() {
        let signals = extract(&payload());
        let tiles = derive_departments(
            &signals,
            &risks(&[("Pune", 72.0), ("Nagpur", 41.0)]),
            Some("Nagpur"),
        );
        assert_eq!(metric_value(&tiles[0], "Outbreak Risk"), "40.0%");
        assert_eq!(metric_value(&tiles[2], "Hotspots"), "1");
        // Nagpur's safety factor is a placeholder.
        assert!(tiles[2].factors.is_empty());
    }

    #[test]
    fn missing_data_renders_placeholder() {
        let signals = extract(&payload());
        let tiles = derive_departments(&signals, &BTreeMap::new(), None);
        let infra = &tiles[1];
        assert!(infra.metrics.iter().all(|m| m.value == PLACEHOLDER));
        assert!(infra.factors.is_empty());
        assert_eq!(metric_value(&tiles[3], "Satisfaction"), PLACEHOLDER);
    }

    #[test]
    fn infrastructure_condition_inverts_repair_probability() {
        let signals = extract(&json!({
            "pipelines": { "infrastructure": { "data": {
                "A": { "risk": 30, "backlog_cr": 1250.5, "critical_roads_count": 2, "top_factor": "SH-2" },
                "B": { "risk": 50, "backlog_cr": 10, "critical_roads_count": 0 }
            } } }
        }));
        let tiles = derive_departments(&signals, &risks(&[("A", 30.0), ("B", 50.0)]), None);
        let infra = &tiles[1];
        assert_eq!(metric_value(infra, "Condition Score"), "60/100");
        assert_eq!(metric_value(infra, "Repair Backlog"), "₹1,260.5 Cr");
        assert_eq!(metric_value(infra, "Critical Roads"), "2");
        assert_eq!(infra.factors[0].name, "SH-2");
    }

    #[test]
    fn inbound_tile_used_when_domain_absent() {
        let signals = extract(&json!({
            "departments": [{
                "id": "infrastructure",
                "name": "Roads & Bridges",
                "metrics": [{ "label": "Condition Score", "value": "71/100" }]
            }]
        }));
        let tiles = derive_departments(&signals, &BTreeMap::new(), None);
        assert_eq!(tiles[1].name, "Roads & Bridges");
        assert_eq!(metric_value(&tiles[1], "Condition Score"), "71/100");
        assert_eq!(tiles[0].name, "Health");
    }

    #[test]
    fn kpis_count_alerts_and_high_risk_districts() {
        let signals = extract(&payload());
        let fused = risks(&[("Pune", 72.0), ("Nagpur", 41.0), ("Thane", 50.0)]);
        let alerts = [
            alert("Pune", RiskLevel::Critical),
            alert("Thane", RiskLevel::Critical),
            alert("Nagpur", RiskLevel::Medium),
        ];
        let kpis = derive_kpis(&signals, &fused, &alerts, &FusionConfig::default(), None);
        assert_eq!(kpis.critical.value, KpiValue::Count(2));
        assert_eq!(kpis.high_risk.value, KpiValue::Text("2/3".to_string()));
        assert_eq!(kpis.population.value, KpiValue::Text("2,000".to_string()));
        assert_eq!(kpis.budget.value, KpiValue::Text("₹15 Cr".to_string()));
        assert_eq!(kpis.critical.label, "CRITICAL ALERTS");
        assert_eq!(kpis.budget.icon_hint, "Wallet");

        let scoped = derive_kpis(&signals, &fused, &alerts, &FusionConfig::default(), Some("Pune"));
        assert_eq!(scoped.critical.value, KpiValue::Count(1));
        assert_eq!(scoped.high_risk.value, KpiValue::Text("1/1".to_string()));
        assert_eq!(scoped.population.value, KpiValue::Text("1,200".to_string()));
    }

    #[test]
    fn kpis_degrade_to_placeholders() {
        let signals = extract(&json!({}));
        let kpis = derive_kpis(&signals, &BTreeMap::new(), &[], &FusionConfig::default(), None);
        assert_eq!(kpis.critical.value, KpiValue::Count(0));
        assert_eq!(kpis.high_risk.value, KpiValue::Text("0/1".to_string()));
        assert_eq!(kpis.population.value, KpiValue::Text(PLACEHOLDER.to_string()));
        assert_eq!(kpis.budget.value, KpiValue::Text(PLACEHOLDER.to_string()));
    }

    #[test]
    fn kpi_overrides_win_and_pending_falls_back_to_citizen_services() {
        let signals = extract(&json!({
            "pipelines": { "citizenServicesFeedback": { "data": { "dashboard": {
                "A": { "metrics": [1, 2, 3, 4], "pending": 1500 },
                "B": { "metrics": [1, 2, 3, 4], "pending": 250 }
            } } } }
        }));
        let kpis = derive_kpis(&signals, &BTreeMap::new(), &[], &FusionConfig::default(), None);
        assert_eq!(kpis.population.value, KpiValue::Text("1,750".to_string()));

        let config = FusionConfig::default()
            .with_kpi_overrides(Some("3.2 lakh".to_string()), Some("₹40 Cr".to_string()));
        let kpis = derive_kpis(&signals, &BTreeMap::new(), &[], &config, None);
        assert_eq!(kpis.population.value, KpiValue::Text("3.2 lakh".to_string()));
        assert_eq!(kpis.budget.value, KpiValue::Text("₹40 Cr".to_string()));
    }
}
