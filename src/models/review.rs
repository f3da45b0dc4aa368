//! Product reviews with simple moderation status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    /// Copied at write time so renames do not rewrite published reviews.
    pub username: String,
    pub rating: i64,
    pub title: String,
    pub body: String,
    pub verified: bool,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        product_id: String,
        user_id: String,
        username: String,
        rating: i64,
        title: String,
        body: String,
        verified: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            product_id,
            user_id,
            username,
            rating,
            title,
            body,
            verified,
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, user_id, username, rating, title, body,
                                 verified, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.product_id)
        .bind(&self.user_id)
        .bind(&self.username)
        .bind(self.rating)
        .bind(&self.title)
        .bind(&self.body)
        .bind(self.verified)
        .bind(self.status)
        .bind(self.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn exists_for(
        pool: &SqlitePool,
        product_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE product_id = ? AND user_id = ?")
                .bind(product_id)
                .bind(user_id)
                .fetch_one(pool)
                .await?;
        Ok(count > 0)
    }

    /// Approved reviews for a product, newest first.
    pub async fn list_approved(pool: &SqlitePool, product_id: &str) -> Result<Vec<Self>, AppError> {
        let reviews = sqlx::query_as::<_, Self>(
            "SELECT * FROM reviews WHERE product_id = ? AND status = 'approved' ORDER BY created_at DESC",
        )
        .bind(product_id)
        .fetch_all(pool)
        .await?;
        Ok(reviews)
    }

    pub async fn set_status(
        pool: &SqlitePool,
        id: &str,
        status: ReviewStatus,
    ) -> Result<Option<Self>, AppError> {
        sqlx::query("UPDATE reviews SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(pool)
            .await?;
        let review = sqlx::query_as::<_, Self>("SELECT * FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(review)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
