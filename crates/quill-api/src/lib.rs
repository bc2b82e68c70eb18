//! Quill REST API
//!
//! This crate provides the Axum-based HTTP API for Quill: account
//! registration and login, categories, articles, and user administration.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
