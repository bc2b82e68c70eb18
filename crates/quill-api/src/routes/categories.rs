//! Category routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use quill_auth::RequireAdmin;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{CategoryResponse, CreateCategoryRequest};

const MAX_NAME_LENGTH: usize = 64;

/// GET /api/v1/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.db.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/categories (Admin only)
async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Category name must be between 1 and {} characters",
            MAX_NAME_LENGTH
        )));
    }

    let category = state.db.insert_category(name).await?;
    info!("Admin {} created category {}", admin.subject_id, category.name);

    Ok((StatusCode::CREATED, Json(category.into())))
}

/// DELETE /api/v1/categories/{id} (Admin only)
async fn delete_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    debug!("Deleting category: {}", id);

    let articles = state.db.count_articles_in_category(id).await?;
    if articles > 0 {
        return Err(ApiError::Conflict(format!(
            "Category {} still has {} article(s)",
            id, articles
        )));
    }

    if state.db.delete_category(id).await? {
        info!("Admin {} deleted category {}", admin.subject_id, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Category: {}", id)))
    }
}

/// Public category routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/categories", get(list_categories))
}

/// Category routes that require an admin caller
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/categories", post(create_category))
        .route("/api/v1/categories/{id}", delete(delete_category))
}
