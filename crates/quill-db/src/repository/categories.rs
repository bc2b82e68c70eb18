//! Category operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::Category;
use crate::repository::Database;

impl Database {
    /// Insert a new category
    pub async fn insert_category(&self, name: &str) -> Result<Category, DbError> {
        let now = Utc::now();

        let existing = sqlx::query("SELECT id FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(DbError::Duplicate(format!("Category '{}' already exists", name)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, created_at)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(Category {
            id: result.get("id"),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Get a category by ID
    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, DbError> {
        let result = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Category::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List all categories
    pub async fn list_categories(&self) -> Result<Vec<Category>, DbError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Category::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Count the articles filed under a category
    pub async fn count_articles_in_category(&self, id: i64) -> Result<i64, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE category_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(result.get("count"))
    }

    /// Delete a category
    pub async fn delete_category(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
