//! Health endpoint for load balancers

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthReport {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    database: &'static str,
}

/// GET /health
///
/// Answers 503 while the database cannot be reached.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let (status, code, database) = match state.db.ping().await {
        Ok(()) => ("healthy", StatusCode::OK, "up"),
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };
    metrics::counter!("quill_health_checks_total", "status" => status).increment(1);

    let report = HealthReport {
        status,
        service: "quill",
        version: env!("CARGO_PKG_VERSION"),
        database,
    };
    (code, Json(report))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
}
