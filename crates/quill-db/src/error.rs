//! Database error types
//!
//! A missing row is not an error here: lookups return `Option` and
//! mutations report whether a row was affected.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Connection(#[from] sqlx::Error),

    /// A unique name (username, category name) is already taken
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}
