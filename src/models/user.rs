//! User accounts: row type, profile updates, wishlist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

/// Saved shipping address on a user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub addresses: Json<Vec<Address>>,
    pub wishlist: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub addresses: Option<Vec<Address>>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            is_admin: false,
            first_name: None,
            last_name: None,
            phone: None,
            addresses: Json(Vec::new()),
            wishlist: Json(Vec::new()),
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_admin, first_name,
                               last_name, phone, addresses, wishlist, created_at, updated_at, last_login)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(self.is_admin)
        .bind(&self.first_name)
        .bind(&self.last_name)
        .bind(&self.phone)
        .bind(&self.addresses)
        .bind(&self.wishlist)
        .bind(self.created_at)
        .bind(self.updated_at)
        .bind(self.last_login)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, Self>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// True when the username or the email is already taken.
    pub async fn exists(pool: &SqlitePool, username: &str, email: &str) -> Result<bool, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(pool)
                .await?;
        Ok(count > 0)
    }

    pub async fn touch_last_login(pool: &SqlitePool, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = ?, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<Self>, AppError> {
        let Some(mut user) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        if let Some(v) = &update.first_name {
            user.first_name = Some(v.clone());
        }
        if let Some(v) = &update.last_name {
            user.last_name = Some(v.clone());
        }
        if let Some(v) = &update.phone {
            user.phone = Some(v.clone());
        }
        if let Some(v) = &update.addresses {
            user.addresses = Json(v.clone());
        }
        user.updated_at = Utc::now();
        sqlx::query(
            r#"
            UPDATE users SET first_name = ?, last_name = ?, phone = ?, addresses = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.addresses)
        .bind(user.updated_at)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(Some(user))
    }

    /// Add a product id to the wishlist; a no-op when already present.
    pub async fn wishlist_add(pool: &SqlitePool, id: &str, product_id: &str) -> Result<Vec<String>, AppError> {
        let mut user = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;
        if !user.wishlist.0.iter().any(|p| p == product_id) {
            user.wishlist.0.push(product_id.to_string());
            Self::save_wishlist(pool, id, &user.wishlist).await?;
        }
        Ok(user.wishlist.0)
    }

    pub async fn wishlist_remove(pool: &SqlitePool, id: &str, product_id: &str) -> Result<Vec<String>, AppError> {
        let mut user = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;
        user.wishlist.0.retain(|p| p != product_id);
        Self::save_wishlist(pool, id, &user.wishlist).await?;
        Ok(user.wishlist.0)
    }

    async fn save_wishlist(pool: &SqlitePool, id: &str, wishlist: &Json<Vec<String>>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET wishlist = ?, updated_at = ? WHERE id = ?")
            .bind(wishlist)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create_pool, ensure_schema};

    async fn test_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn insert_and_find() {
        let pool = test_pool().await;
        let user = User::new("jane".into(), "jane@example.com".into(), "hash".into());
        user.insert(&pool).await.unwrap();

        let found = User::find_by_email(&pool, "jane@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(!found.is_admin);
        assert!(User::exists(&pool, "jane", "other@example.com").await.unwrap());
        assert!(!User::exists(&pool, "john", "john@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn wishlist_add_is_idempotent() {
        let pool = test_pool().await;
        let user = User::new("jane".into(), "jane@example.com".into(), "hash".into());
        user.insert(&pool).await.unwrap();

        User::wishlist_add(&pool, &user.id, "p1").await.unwrap();
        let list = User::wishlist_add(&pool, &user.id, "p1").await.unwrap();
        assert_eq!(list, vec!["p1".to_string()]);

        let list = User::wishlist_remove(&pool, &user.id, "p1").await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn password_hash_is_not_serialized() {
        let user = User::new("jane".into(), "jane@example.com".into(), "supersecret".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "jane");
    }
}
