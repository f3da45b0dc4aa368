//! Catalog categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub image: Option<String>,
    pub featured: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryInput {
    pub name: String,
    /// Derived from the name when absent.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub sort_order: i64,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub image: Option<String>,
    pub featured: Option<bool>,
    pub sort_order: Option<i64>,
}

impl Category {
    pub fn new(input: CategoryInput, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            slug,
            description: input.description,
            parent_id: input.parent_id,
            image: input.image,
            featured: input.featured,
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description, parent_id, image, featured,
                                    sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.description)
        .bind(&self.parent_id)
        .bind(&self.image)
        .bind(self.featured)
        .bind(self.sort_order)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, AppError> {
        let categories =
            sqlx::query_as::<_, Self>("SELECT * FROM categories ORDER BY sort_order, name")
                .fetch_all(pool)
                .await?;
        Ok(categories)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, AppError> {
        let category = sqlx::query_as::<_, Self>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(category)
    }

    pub async fn slug_taken(pool: &SqlitePool, slug: &str, exclude_id: Option<&str>) -> Result<bool, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM categories WHERE slug = ? AND id != COALESCE(?, '')")
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, description = ?, parent_id = ?, image = ?, featured = ?,
                sort_order = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.description)
        .bind(&self.parent_id)
        .bind(&self.image)
        .bind(self.featured)
        .bind(self.sort_order)
        .bind(Utc::now())
        .bind(&self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
