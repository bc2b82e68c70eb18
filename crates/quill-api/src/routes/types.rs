//! Request/Response DTOs

use quill_db::{ArticleDetail, Author, Category, CategoryRef, User};
use serde::{Deserialize, Serialize};

// ==================== Account Types ====================

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Password change request
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// User response (without password)
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar: user.avatar,
            role: user.role.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// Role change request
#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

// ==================== Category Types ====================

/// Create category request
#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// Category response
#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            created_at: category.created_at.to_rfc3339(),
        }
    }
}

// ==================== Article Types ====================

/// Create or replace article request
#[derive(Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
    pub category_id: i64,
    #[serde(default)]
    pub cover_img: Option<String>,
    #[serde(default = "default_publish")]
    pub is_publish: bool,
}

fn default_publish() -> bool {
    true
}

/// Article response, with the author and category embedded
#[derive(Serialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub cover_img: Option<String>,
    pub author: Author,
    pub category: CategoryRef,
    pub view_count: i64,
    pub is_publish: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ArticleDetail> for ArticleResponse {
    fn from(detail: ArticleDetail) -> Self {
        let article = detail.article;
        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            cover_img: article.cover_img,
            author: detail.author,
            category: detail.category,
            view_count: article.view_count,
            is_publish: article.is_publish,
            created_at: article.created_at.to_rfc3339(),
            updated_at: article.updated_at.to_rfc3339(),
        }
    }
}
