//! Product catalog rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Men,
    Women,
    Unisex,
}

impl Category {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "men" => Ok(Self::Men),
            "women" => Ok(Self::Women),
            "unisex" => Ok(Self::Unisex),
            other => Err(AppError::Validation(format!(
                "category must be one of men, women, unisex (got '{other}')"
            ))),
        }
    }
}

/// Garment sizes, serialized as their uppercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Size {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
}

impl Size {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim() {
            "XS" => Ok(Self::XS),
            "S" => Ok(Self::S),
            "M" => Ok(Self::M),
            "L" => Ok(Self::L),
            "XL" => Ok(Self::XL),
            "XXL" => Ok(Self::XXL),
            other => Err(AppError::Validation(format!(
                "size must be one of XS, S, M, L, XL, XXL (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub category: Category,
    pub sizes: Json<Vec<Size>>,
    pub colors: Json<Vec<String>>,
    /// Paths under `/uploads`.
    pub images: Json<Vec<String>>,
    pub in_stock: bool,
    pub stock_quantity: i64,
    pub featured: bool,
    pub on_sale: bool,
    pub compare_at_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        slug: String,
        description: String,
        price: f64,
        category: Category,
        sizes: Vec<Size>,
        colors: Vec<String>,
        images: Vec<String>,
        stock_quantity: i64,
        featured: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            slug,
            description,
            price,
            category,
            sizes: Json(sizes),
            colors: Json(colors),
            images: Json(images),
            in_stock: stock_quantity > 0,
            stock_quantity,
            featured,
            on_sale: false,
            compare_at_price: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, description, price, category, sizes, colors,
                                  images, in_stock, stock_quantity, featured, on_sale,
                                  compare_at_price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.description)
        .bind(self.price)
        .bind(self.category)
        .bind(&self.sizes)
        .bind(&self.colors)
        .bind(&self.images)
        .bind(self.in_stock)
        .bind(self.stock_quantity)
        .bind(self.featured)
        .bind(self.on_sale)
        .bind(self.compare_at_price)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, AppError> {
        let product = sqlx::query_as::<_, Self>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(product)
    }

    pub async fn slug_taken(pool: &SqlitePool, slug: &str) -> Result<bool, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE slug = ?")
            .bind(slug)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    /// Persist every mutable column. Used after handlers overlay form fields.
    pub async fn save(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, slug = ?, description = ?, price = ?, category = ?, sizes = ?,
                colors = ?, images = ?, in_stock = ?, stock_quantity = ?, featured = ?,
                on_sale = ?, compare_at_price = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.description)
        .bind(self.price)
        .bind(self.category)
        .bind(&self.sizes)
        .bind(&self.colors)
        .bind(&self.images)
        .bind(self.in_stock)
        .bind(self.stock_quantity)
        .bind(self.featured)
        .bind(self.on_sale)
        .bind(self.compare_at_price)
        .bind(Utc::now())
        .bind(&self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Returns true when a row was deleted.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_ids(pool: &SqlitePool, ids: &[String]) -> Result<Vec<Self>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM products WHERE id IN ({placeholders})");
        let mut query = sqlx::query_as::<_, Self>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create_pool, ensure_schema};

    pub(crate) fn sample(name: &str, slug: &str, price: f64, stock: i64) -> Product {
        Product::new(
            name.into(),
            slug.into(),
            "a shirt".into(),
            price,
            Category::Unisex,
            vec![Size::M, Size::L],
            vec!["black".into()],
            vec!["/uploads/x.png".into()],
            stock,
            false,
        )
    }

    #[tokio::test]
    async fn round_trip_preserves_json_fields() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let product = sample("Classic Tee", "classic-tee", 24.99, 10);
        product.insert(&pool).await.unwrap();

        let found = Product::find_by_id(&pool, &product.id).await.unwrap().unwrap();
        assert_eq!(found.sizes.0, vec![Size::M, Size::L]);
        assert_eq!(found.category, Category::Unisex);
        assert!(found.in_stock);
        assert!(Product::slug_taken(&pool, "classic-tee").await.unwrap());
    }

    #[test]
    fn category_parse_rejects_unknown() {
        assert!(Category::parse("kids").is_err());
        assert_eq!(Category::parse("men").unwrap(), Category::Men);
    }
}
