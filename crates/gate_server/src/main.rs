use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{LiveFeedPushResponse, ScanLog, ValidateScanRequest, ValidateScanResponse},
};
use tracing::{error, info, warn};

mod app_state;
mod config;
mod permits;

use app_state::AppState;
use config::load_settings;
use permits::PermitRegistry;

#[derive(Debug, Deserialize)]
struct LiveFeedQuery {
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let permits = match &settings.permits_file {
        Some(path) => PermitRegistry::load(path).map_err(|error| {
            error!(path = %path.display(), %error, "failed to load permits file");
            error
        })?,
        None => PermitRegistry::with_demo_permits(),
    };
    if permits.is_empty() {
        warn!("permit registry is empty; every scan will be rejected");
    }
    info!(permits = permits.len(), "permit registry ready");

    let state = AppState::new(permits, settings.live_feed_capacity);
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "gate server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/qr/validate", post(validate_scan))
        .route("/api/dashboard/live-feed/push", post(push_live_feed))
        .route("/api/dashboard/live-feed", get(live_feed))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation | ErrorCode::Expired => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

async fn validate_scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateScanRequest>,
) -> (StatusCode, Json<ValidateScanResponse>) {
    match state.permits.check(&req.permit_id, req.scanned_at) {
        Ok(permit) => {
            let scan_log = ScanLog {
                id: state.allocate_scan_log_id(),
                permit_id: req.permit_id.clone(),
                gate: req.gate,
                scanned_at: req.scanned_at,
                guard_id: req.guard_id,
            };
            info!(
                scan_log_id = scan_log.id.0,
                permit_id = %req.permit_id,
                gate = %req.gate,
                "validate: permit accepted"
            );
            let response = ValidateScanResponse::accepted(permit, &scan_log);
            state.push_feed(scan_log).await;
            (StatusCode::OK, Json(response))
        }
        Err(err) => {
            warn!(permit_id = %req.permit_id, gate = %req.gate, %err, "validate: permit rejected");
            (
                status_for(err.code),
                Json(ValidateScanResponse::rejected(err.message)),
            )
        }
    }
}

async fn push_live_feed(
    State(state): State<Arc<AppState>>,
    Json(scan_log): Json<ScanLog>,
) -> Json<LiveFeedPushResponse> {
    info!(scan_log_id = scan_log.id.0, permit_id = %scan_log.permit_id, "live feed: scan pushed");
    state.push_feed(scan_log).await;
    Json(LiveFeedPushResponse { success: true })
}

async fn live_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveFeedQuery>,
) -> Result<Json<Vec<ScanLog>>, (StatusCode, Json<ApiError>)> {
    let capacity = state.live_feed_capacity();
    let limit = query.limit.unwrap_or(capacity);
    if limit == 0 || limit > capacity {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                format!("limit must be between 1 and {capacity}"),
            )),
        ));
    }
    Ok(Json(state.recent_feed(limit).await))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
