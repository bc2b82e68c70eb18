//! API routes

mod articles;
mod auth;
mod categories;
mod health;
pub mod metrics;
pub mod types;
mod users;

use axum::{Router, middleware};
use quill_auth::identity_layer;
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    // Admin endpoints are gated as a group; handlers then check the role.
    let admin = Router::new()
        .merge(categories::admin_routes())
        .merge(users::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            identity_layer,
        ));

    let mut router = Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(categories::routes())
        .merge(articles::routes())
        .merge(admin)
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
