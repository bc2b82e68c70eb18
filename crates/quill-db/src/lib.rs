//! Quill Database Layer
//!
//! This crate provides the persistence layer for Quill: user accounts,
//! categories and articles, stored in SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;
