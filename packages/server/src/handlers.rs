//! HTTP handler functions for the dashboard API.

use actix_web::{HttpResponse, web};
use risk_fusion::{FusionRequest, fuse};
use risk_fusion_server_models::{ApiError, ApiHealth, DashboardQueryParams};

use crate::{AppState, DASHBOARD_SOURCE_HEADER};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/dashboard`
///
/// Loads a snapshot (live, else fallback) and returns its fused form. The
/// `X-Dashboard-Source` header says which state served it. Responds `503`
/// when no snapshot could be loaded.
pub async fn dashboard(
    state: web::Data<AppState>,
    params: web::Query<DashboardQueryParams>,
) -> HttpResponse {
    let snapshot = match state.source.load().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::error!("Failed to assemble dashboard data: {e}");
            return HttpResponse::ServiceUnavailable().json(ApiError {
                error: e.to_string(),
            });
        }
    };

    let request = FusionRequest::now().with_district(params.district.as_deref());
    let document = fuse(&snapshot.payload, &state.fusion, &request);

    HttpResponse::Ok()
        .insert_header((DASHBOARD_SOURCE_HEADER, snapshot.origin.as_ref()))
        .json(document)
}
