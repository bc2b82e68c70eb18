//! Article routes
//!
//! Reads are public. Writes need an authenticated caller, and updates and
//! deletes are additionally restricted to the article's owner.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use quill_auth::{VerifiedIdentity, authorize_mutation};
use quill_db::{NewArticle, UpdateArticle};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{ArticleRequest, ArticleResponse};

/// Reject writes that point at a category that does not exist
async fn ensure_category(state: &AppState, category_id: i64) -> Result<(), ApiError> {
    if state.db.get_category(category_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Unknown category: {}",
            category_id
        )));
    }
    Ok(())
}

/// GET /api/v1/articles
async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleResponse>>, ApiError> {
    let articles = state.db.list_articles().await?;
    Ok(Json(articles.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/articles/{id}
///
/// Every read counts as a view.
async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, ApiError> {
    if !state.db.increment_view_count(id).await? {
        return Err(ApiError::NotFound(format!("Article: {}", id)));
    }

    let article = state
        .db
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Article: {}", id)))?;

    Ok(Json(article.into()))
}

/// POST /api/v1/articles
async fn create_article(
    identity: VerifiedIdentity,
    State(state): State<AppState>,
    Json(request): Json<ArticleRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    ensure_category(&state, request.category_id).await?;

    let article = state
        .db
        .insert_article(NewArticle {
            title: request.title,
            content: request.content,
            cover_img: request.cover_img,
            category_id: request.category_id,
            user_id: identity.subject_id,
            is_publish: request.is_publish,
        })
        .await?;

    info!("User {} created article {}", identity.subject_id, article.id);

    let detail = state
        .db
        .get_article(article.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Article: {}", article.id)))?;

    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// PUT /api/v1/articles/{id} (owner only)
async fn update_article(
    identity: VerifiedIdentity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    authorize_mutation(&identity, &state.db, id).await?;
    ensure_category(&state, request.category_id).await?;

    debug!("Updating article: {}", id);

    let updated = state
        .db
        .update_article(
            id,
            UpdateArticle {
                title: request.title,
                content: request.content,
                cover_img: request.cover_img,
                category_id: request.category_id,
                is_publish: request.is_publish,
            },
        )
        .await?;
    if !updated {
        return Err(ApiError::NotFound(format!("Article: {}", id)));
    }

    let article = state
        .db
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Article: {}", id)))?;

    info!("User {} updated article {}", identity.subject_id, id);
    Ok(Json(article.into()))
}

/// DELETE /api/v1/articles/{id} (owner only)
async fn delete_article(
    identity: VerifiedIdentity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize_mutation(&identity, &state.db, id).await?;

    if state.db.delete_article(id).await? {
        info!("User {} deleted article {}", identity.subject_id, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Article: {}", id)))
    }
}

/// Create article routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/articles", get(list_articles).post(create_article))
        .route(
            "/api/v1/articles/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
}
