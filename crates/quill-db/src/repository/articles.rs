//! Article operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Article, ArticleDetail, NewArticle, UpdateArticle};
use crate::repository::Database;

/// Article rows joined with the author's name and the category's name
const ARTICLE_DETAIL_SELECT: &str = r#"
    SELECT a.id AS id, a.title AS title, a.content AS content, a.cover_img AS cover_img,
           a.category_id AS category_id, a.user_id AS user_id, a.view_count AS view_count,
           a.is_publish AS is_publish, a.created_at AS created_at, a.updated_at AS updated_at,
           u.username AS author_username, c.name AS category_name
    FROM articles a
    JOIN users u ON u.id = a.user_id
    JOIN categories c ON c.id = a.category_id
"#;

impl Database {
    // ==================== Article Operations ====================

    /// Insert a new article
    pub async fn insert_article(&self, article: NewArticle) -> Result<Article, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, content, cover_img, category_id, user_id,
                                  view_count, is_publish, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.cover_img)
        .bind(article.category_id)
        .bind(article.user_id)
        .bind(article.is_publish)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(Article {
            id: result.get("id"),
            title: article.title,
            content: article.content,
            cover_img: article.cover_img,
            category_id: article.category_id,
            user_id: article.user_id,
            view_count: 0,
            is_publish: article.is_publish,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get an article by ID, with its author and category
    pub async fn get_article(&self, id: i64) -> Result<Option<ArticleDetail>, DbError> {
        let result = sqlx::query(&format!("{} WHERE a.id = ?", ARTICLE_DETAIL_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result
            .map(|row| ArticleDetail::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// List all articles, newest first
    pub async fn list_articles(&self) -> Result<Vec<ArticleDetail>, DbError> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY a.created_at DESC, a.id DESC",
            ARTICLE_DETAIL_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| ArticleDetail::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Look up the owner of an article
    ///
    /// Always reads the current row; callers authorizing a mutation must not
    /// reuse an owner id from an earlier read.
    pub async fn get_article_owner(&self, id: i64) -> Result<Option<i64>, DbError> {
        let result = sqlx::query("SELECT user_id FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result.map(|row| row.get("user_id")))
    }

    /// Update an article's content fields
    pub async fn update_article(&self, id: i64, update: UpdateArticle) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, content = ?, cover_img = ?, category_id = ?, is_publish = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.content)
        .bind(&update.cover_img)
        .bind(update.category_id)
        .bind(update.is_publish)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bump the view counter of an article
    pub async fn increment_view_count(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE articles SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an article
    pub async fn delete_article(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
