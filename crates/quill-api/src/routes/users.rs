//! User administration routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use quill_auth::RequireAdmin;
use quill_db::{ParseError, UserRole};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{UpdateRoleRequest, UserResponse};

/// GET /api/v1/users (Admin only)
async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// DELETE /api/v1/users/{id} (Admin only)
///
/// The user's articles go with the account.
async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if admin.subject_id == id {
        return Err(ApiError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    debug!("Deleting user: {}", id);

    if state.db.delete_user(id).await? {
        info!("Admin {} deleted user {}", admin.subject_id, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("User: {}", id)))
    }
}

/// PUT /api/v1/users/{id}/role (Admin only)
///
/// Tokens already issued keep the role they were minted with; the new role
/// applies from the user's next login.
async fn update_user_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let role: UserRole = request
        .role
        .parse()
        .map_err(|e: ParseError| ApiError::BadRequest(e.to_string()))?;

    if admin.subject_id == id {
        return Err(ApiError::BadRequest(
            "Admins cannot change their own role".to_string(),
        ));
    }

    if !state.db.update_user_role(id, role).await? {
        return Err(ApiError::NotFound(format!("User: {}", id)));
    }

    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    info!("Admin {} set role of user {} to {}", admin.subject_id, id, role);
    Ok(Json(user.into()))
}

/// User routes that require an admin caller
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users/{id}", delete(delete_user))
        .route("/api/v1/users/{id}/role", put(update_user_role))
}
