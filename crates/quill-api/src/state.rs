//! Application state

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use quill_auth::{IdentityGate, TokenCodec};
use quill_db::Database;
use std::sync::Arc;

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: Arc<TokenCodec>,
    pub gate: Arc<IdentityGate>,
}

impl AppState {
    /// Build the state, wiring the identity gate to the database
    pub fn new(db: Database, tokens: Arc<TokenCodec>) -> Self {
        let gate = Arc::new(IdentityGate::new(tokens.clone(), Arc::new(db.clone())));
        Self { db, tokens, gate }
    }
}

impl FromRef<AppState> for Arc<IdentityGate> {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}
