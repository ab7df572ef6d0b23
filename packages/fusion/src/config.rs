//! Tunable fusion parameters.
//!
//! Defaults are compiled in; deployments may override them with a TOML
//! file such as:
//!
//! ```toml
//! ridge_lambda = 4.0
//! min_training_samples = 6
//! synthetic_alert_limit = 3
//! population_override = "1,20,000"
//! ```
//!
//! Risk-level thresholds are fixed in [`risk_fusion_models`] and are not
//! configurable.

use std::path::Path;

use serde::Deserialize;

use crate::FusionError;

/// Default ridge penalty.
pub const DEFAULT_RIDGE_LAMBDA: f64 = 10.0;

/// Fewest labeled districts the imputer will fit on.
pub const DEFAULT_MIN_TRAINING_SAMPLES: usize = 5;

/// Number of districts the alert synthesizer reports on.
pub const DEFAULT_SYNTHETIC_ALERT_LIMIT: usize = 5;

/// Parameters for one fusion run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionConfig {
    /// L2 penalty added to the normal equations.
    pub ridge_lambda: f64,
    /// Minimum number of labeled districts required to fit the imputer.
    pub min_training_samples: usize,
    /// Maximum number of synthesized alerts.
    pub synthetic_alert_limit: usize,
    /// Fixed text for the affected-population KPI.
    pub population_override: Option<String>,
    /// Fixed text for the budget-impact KPI.
    pub budget_override: Option<String>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            ridge_lambda: DEFAULT_RIDGE_LAMBDA,
            min_training_samples: DEFAULT_MIN_TRAINING_SAMPLES,
            synthetic_alert_limit: DEFAULT_SYNTHETIC_ALERT_LIMIT,
            population_override: None,
            budget_override: None,
        }
    }
}

impl FusionConfig {
    /// Parses a TOML document, filling unspecified keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] if the TOML is malformed, has unknown
    /// keys, or carries an invalid value.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, FusionError> {
        let config: Self = toml::de::from_str(toml_str).map_err(|e| FusionError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Io`] if the file cannot be read, or
    /// [`FusionError::Config`] if its contents are invalid.
    pub fn from_file(path: &Path) -> Result<Self, FusionError> {
        let contents = std::fs::read_to_string(path)?;
        log::info!("Loaded fusion config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] for a negative or non-finite
    /// penalty or a zero training-sample minimum.
    pub fn validate(&self) -> Result<(), FusionError> {
        if !self.ridge_lambda.is_finite() || self.ridge_lambda < 0.0 {
            return Err(FusionError::Config {
                message: format!(
                    "ridge_lambda must be finite and >= 0, got {}",
                    self.ridge_lambda
                ),
            });
        }
        if self.min_training_samples == 0 {
            return Err(FusionError::Config {
                message: "min_training_samples must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Returns a copy with KPI overrides applied when given.
    #[must_use]
    pub fn with_kpi_overrides(
        mut self,
        population: Option<String>,
        budget: Option<String>,
    ) -> Self {
        if population.is_some() {
            self.population_override = population;
        }
        if budget.is_some() {
            self.budget_override = budget;
        }
        self
    }
}
