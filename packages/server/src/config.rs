//! Environment-driven server configuration.

use std::path::PathBuf;
use std::time::Duration;

use risk_fusion::{FusionConfig, FusionError};

/// Default fallback snapshot location.
pub const DEFAULT_FALLBACK_PATH: &str = "data/dashboard_snapshot.json";

/// Settings read from the process environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `BIND_ADDR`
    pub bind_addr: String,
    /// `PORT`
    pub port: u16,
    /// `UPSTREAM_URL`; without it every request is served from the fallback.
    pub upstream_url: Option<String>,
    /// `FALLBACK_PATH`
    pub fallback_path: PathBuf,
    /// `UPSTREAM_TIMEOUT_SECS`
    pub upstream_timeout: Duration,
    /// `UPSTREAM_MAX_RETRIES`
    pub upstream_max_retries: u32,
    /// `FUSION_CONFIG`: optional TOML file with fusion parameters.
    pub fusion_config_path: Option<PathBuf>,
    /// `KPI_POPULATION_VALUE`
    pub population_override: Option<String>,
    /// `KPI_BUDGET_VALUE`
    pub budget_override: Option<String>,
    /// `CORS_ALLOW_ORIGINS`, comma separated; empty means any origin.
    pub cors_allow_origins: Vec<String>,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, ignoring blank values.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            upstream_url: var("UPSTREAM_URL"),
            fallback_path: var("FALLBACK_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_FALLBACK_PATH), PathBuf::from),
            upstream_timeout: Duration::from_secs(
                var("UPSTREAM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            upstream_max_retries: var("UPSTREAM_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            fusion_config_path: var("FUSION_CONFIG").map(PathBuf::from),
            population_override: var("KPI_POPULATION_VALUE"),
            budget_override: var("KPI_BUDGET_VALUE"),
            cors_allow_origins: var("CORS_ALLOW_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty() && *o != "*")
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Loads the fusion parameters: the `FUSION_CONFIG` file (or defaults)
    /// with the KPI overrides applied on top.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError`] if the config file cannot be read or is
    /// invalid.
    pub fn fusion_config(&self) -> Result<FusionConfig, FusionError> {
        let base = match &self.fusion_config_path {
            Some(path) => FusionConfig::from_file(path)?,
            None => FusionConfig::default(),
        };
        Ok(base.with_kpi_overrides(
            self.population_override.clone(),
            self.budget_override.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_url, None);
        assert_eq!(config.fallback_path, PathBuf::from(DEFAULT_FALLBACK_PATH));
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.upstream_max_retries, 1);
        assert!(config.cors_allow_origins.is_empty());
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = config(&[
            ("PORT", "not-a-port"),
            ("UPSTREAM_URL", " https://gateway.example/dashboard "),
            ("UPSTREAM_MAX_RETRIES", "3"),
            ("KPI_BUDGET_VALUE", "₹12 Cr"),
            ("KPI_POPULATION_VALUE", "  "),
            ("CORS_ALLOW_ORIGINS", "https://a.example, https://b.example"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.upstream_url.as_deref(),
            Some("https://gateway.example/dashboard")
        );
        assert_eq!(config.upstream_max_retries, 3);
        assert_eq!(config.population_override, None);
        assert_eq!(config.cors_allow_origins.len(), 2);

        let fusion = config.fusion_config().unwrap();
        assert_eq!(fusion.budget_override.as_deref(), Some("₹12 Cr"));
    }

    #[test]
    fn wildcard_cors_means_any_origin() {
        assert!(config(&[("CORS_ALLOW_ORIGINS", "*")]).cors_allow_origins.is_empty());
    }

    #[test]
    fn missing_fusion_config_file_is_an_error() {
        let config = config(&[("FUSION_CONFIG", "/nonexistent/fusion.toml")]);
        assert!(matches!(config.fusion_config(), Err(FusionError::Io(_))));
    }
}
