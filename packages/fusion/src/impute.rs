//! Risk imputation for districts no upstream source scored.
//!
//! A ridge model is fit on the districts that do carry a reported risk and
//! used to predict the rest. Features and targets are centered on the
//! training means before fitting, so the penalty shrinks predictions
//! toward the mean training risk rather than toward zero.

use std::collections::BTreeMap;

use risk_fusion_models::{DistrictRisk, RISK_MAX, RISK_MIN, RiskLevel};

use crate::config::FusionConfig;
use crate::extract::FusedSignals;
use crate::features::{FEATURE_COUNT, FeatureVector, build_feature_vector};
use crate::ridge::{fit_ridge, predict};

/// A fitted imputation model.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationModel {
    /// Ridge coefficients over centered features.
    pub coefficients: Vec<f64>,
    /// Per-slot mean of the training features.
    pub feature_means: FeatureVector,
    /// Mean training risk.
    pub target_mean: f64,
    /// Number of labeled districts the model was fit on.
    pub training_samples: usize,
}

impl ImputationModel {
    /// Fits the model, or returns `None` when fewer than `min_samples`
    /// labeled districts are available.
    #[must_use]
    pub fn fit(training: &[(FeatureVector, f64)], lambda: f64, min_samples: usize) -> Option<Self> {
        if training.is_empty() || training.len() < min_samples {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = training.len() as f64;

        let mut feature_means = [0.0; FEATURE_COUNT];
        for (features, _) in training {
            for (mean, value) in feature_means.iter_mut().zip(features) {
                *mean += value / n;
            }
        }
        let target_mean = training.iter().map(|(_, risk)| risk / n).sum::<f64>();

        let x: Vec<FeatureVector> = training
            .iter()
            .map(|(features, _)| center(features, &feature_means))
            .collect();
        let y: Vec<f64> = training.iter().map(|(_, risk)| risk - target_mean).collect();

        Some(Self {
            coefficients: fit_ridge(&x, &y, lambda),
            feature_means,
            target_mean,
            training_samples: training.len(),
        })
    }

    /// Predicts a risk clamped to `[0, 100]`, or `None` if the model
    /// produces a non-finite value.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> Option<f64> {
        let centered = center(features, &self.feature_means);
        let raw = self.target_mean + predict(&self.coefficients, &centered);
        raw.is_finite().then(|| raw.clamp(RISK_MIN, RISK_MAX))
    }
}

fn center(features: &FeatureVector, means: &FeatureVector) -> FeatureVector {
    let mut out = *features;
    for (value, mean) in out.iter_mut().zip(means) {
        *value -= mean;
    }
    out
}

/// Builds the fused `districtRisks` map.
///
/// Reported risks are never overwritten. Districts without one receive an
/// imputed risk (and a level derived from it) when the model could be fit,
/// and stay unset otherwise.
#[must_use]
pub fn impute_district_risks(
    signals: &FusedSignals,
    config: &FusionConfig,
) -> BTreeMap<String, DistrictRisk> {
    let districts = signals.districts();

    let mut training = Vec::new();
    let mut unlabeled = Vec::new();
    for district in &districts {
        let features = build_feature_vector(signals, district);
        match signals.reported_risk(district) {
            Some(risk) => training.push((features, risk)),
            None => unlabeled.push((district.as_str(), features)),
        }
    }

    let model = if unlabeled.is_empty() {
        None
    } else {
        let model = ImputationModel::fit(
            &training,
            config.ridge_lambda,
            config.min_training_samples,
        );
        if model.is_none() {
            log::info!(
                "Only {} labeled districts (need {}); leaving {} district risks unset",
                training.len(),
                config.min_training_samples,
                unlabeled.len(),
            );
        }
        model
    };

    let mut predictions: BTreeMap<&str, f64> = BTreeMap::new();
    if let Some(model) = &model {
        for (district, features) in &unlabeled {
            if let Some(risk) = model.predict(features) {
                predictions.insert(*district, risk);
            }
        }
        log::info!(
            "Imputed risk for {} of {} unscored districts from {} labeled districts",
            predictions.len(),
            unlabeled.len(),
            model.training_samples,
        );
    }

    districts
        .iter()
        .map(|district| {
            let entry = signals.reported_risk(district).map_or_else(
                || match predictions.get(district.as_str()) {
                    Some(&risk) => DistrictRisk {
                        district: district.clone(),
                        risk: Some(risk),
                        level: Some(RiskLevel::from_risk(risk)),
                        imputed: true,
                    },
                    None => DistrictRisk {
                        district: district.clone(),
                        risk: None,
                        level: signals.reported_level(district),
                        imputed: false,
                    },
                },
                |risk| DistrictRisk {
                    district: district.clone(),
                    risk: Some(risk),
                    level: Some(
                        signals
                            .reported_level(district)
                            .unwrap_or_else(|| RiskLevel::from_risk(risk)),
                    ),
                    imputed: false,
                },
            );
            (district.clone(), entry)
        })
        .collect()
}
