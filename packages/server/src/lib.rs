#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web gateway for the governance dashboard.
//!
//! Every `GET /api/dashboard` loads the upstream payload through the
//! Live/Fallback [`ResilientSource`] and runs it through the fusion
//! pipeline. Nothing is cached between requests.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use risk_fusion::FusionConfig;
use risk_fusion_snapshot::{
    FileSnapshotSource, HttpSnapshotSource, ResilientSource, SnapshotSource,
};

pub use config::ServerConfig;

/// Response header naming the state (`live` or `fallback`) that served
/// the dashboard.
pub const DASHBOARD_SOURCE_HEADER: &str = "X-Dashboard-Source";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live/Fallback snapshot loader.
    pub source: ResilientSource,
    /// Fusion parameters.
    pub fusion: FusionConfig,
}

impl AppState {
    /// Builds the snapshot sources and fusion parameters from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the fusion
    /// config file is unreadable or invalid.
    pub fn from_config(config: &ServerConfig) -> std::io::Result<Self> {
        let live: Option<Arc<dyn SnapshotSource>> = match &config.upstream_url {
            Some(url) => Some(Arc::new(
                HttpSnapshotSource::new(
                    url.clone(),
                    config.upstream_timeout,
                    config.upstream_max_retries,
                )
                .map_err(std::io::Error::other)?,
            )),
            None => {
                log::warn!("UPSTREAM_URL not set; serving the fallback snapshot only");
                None
            }
        };
        let fallback = Arc::new(FileSnapshotSource::new(config.fallback_path.clone()));
        let fusion = config.fusion_config().map_err(std::io::Error::other)?;

        Ok(Self {
            source: ResilientSource::new(live, fallback),
            fusion,
        })
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/dashboard", web::get().to(handlers::dashboard)),
    );
}

fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(["GET", "OPTIONS"])
        .allow_any_header()
        .expose_headers([DASHBOARD_SOURCE_HEADER])
}

/// Starts the dashboard gateway.
///
/// Reads [`ServerConfig`] from the environment and starts the Actix-Web
/// HTTP server. This is a regular async function; the caller provides
/// the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid,
/// the HTTP server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();
    let state = web::Data::new(AppState::from_config(&config)?);

    log::info!(
        "Live upstream: {}; fallback snapshot: {}",
        config.upstream_url.as_deref().unwrap_or("<none>"),
        config.fallback_path.display()
    );
    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let origins = config.cors_allow_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.clone(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use super::*;

    fn write_snapshot(payload: &Value) -> PathBuf {
        let path = std::env::temp_dir().join(format!("dashboard-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, payload.to_string()).unwrap();
        path
    }

    fn state(fallback: PathBuf) -> web::Data<AppState> {
        web::Data::new(AppState {
            source: ResilientSource::new(None, Arc::new(FileSnapshotSource::new(fallback))),
            fusion: FusionConfig::default(),
        })
    }

    fn snapshot() -> Value {
        json!({
            "districtRisks": {
                "Pune": { "risk": 82 },
                "Nagpur": { "risk": 55 },
                "Thane": { "risk": 12 }
            },
            "alerts": []
        })
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn dashboard_serves_fused_fallback() {
        let path = write_snapshot(&snapshot());
        let app = test::init_service(
            App::new()
                .app_data(state(path.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(DASHBOARD_SOURCE_HEADER).unwrap(),
            "fallback"
        );

        let body: Value = test::read_body_json(resp).await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(body["districtRisks"]["Pune"]["level"], "critical");
        let districts: Vec<&str> = body["alerts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["district"].as_str().unwrap())
            .collect();
        assert_eq!(districts, ["Pune", "Nagpur", "Thane"]);
        assert_eq!(body["kpiData"]["critical"]["value"], 1);
        assert_eq!(body["kpiData"]["highRisk"]["value"], "2/3");
        assert_eq!(body["departments"].as_array().unwrap().len(), 4);
    }

    #[actix_web::test]
    async fn district_query_scopes_kpis() {
        let path = write_snapshot(&snapshot());
        let app = test::init_service(
            App::new()
                .app_data(state(path.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/dashboard?district=Thane")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        std::fs::remove_file(&path).unwrap();

        assert_eq!(body["kpiData"]["highRisk"]["value"], "0/1");
        assert_eq!(body["kpiData"]["critical"]["value"], 0);
    }

    #[actix_web::test]
    async fn total_failure_is_service_unavailable() {
        let missing = std::env::temp_dir().join(format!("absent-{}.json", uuid::Uuid::new_v4()));
        let app = test::init_service(App::new().app_data(state(missing)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("No snapshot available"));
        assert!(body.get("districtRisks").is_none());
    }

    #[actix_web::test]
    async fn state_from_config_without_upstream() {
        let config = ServerConfig::from_lookup(|key| {
            (key == "KPI_POPULATION_VALUE").then(|| "1,00,000".to_string())
        });
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.fusion.population_override.as_deref(), Some("1,00,000"));
    }
}
