//! Product listing: filters and sort options from query parameters.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::AppError;
use crate::models::product::Product;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProductQuery {
    /// `men`, `women`, `unisex`, or `all` (no filter).
    pub category: Option<String>,
    /// Only `"true"` filters; anything else is ignored.
    pub featured: Option<String>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    /// `price-asc`, `price-desc`, or `newest` (default).
    pub sort_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_products(pool: &SqlitePool, query: &ProductQuery) -> Result<Vec<Product>, AppError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM products WHERE 1=1");

    if let Some(category) = query.category.as_deref().filter(|c| *c != "all" && !c.is_empty()) {
        qb.push(" AND category = ").push_bind(category.to_string());
    }
    if query.featured.as_deref() == Some("true") {
        qb.push(" AND featured = 1");
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        // LIKE is case-insensitive for ASCII in SQLite; escape its wildcards.
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND name LIKE ").push_bind(pattern).push(" ESCAPE '\\'");
    }

    match query.sort_by.as_deref() {
        Some("price-asc") => qb.push(" ORDER BY price ASC"),
        Some("price-desc") => qb.push(" ORDER BY price DESC"),
        _ => qb.push(" ORDER BY created_at DESC"),
    };

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);
    qb.push(" LIMIT ").push_bind(limit as i64);
    qb.push(" OFFSET ").push_bind(offset as i64);

    let products = qb.build_query_as::<Product>().fetch_all(pool).await?;
    Ok(products)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::{Category, Product, Size};
    use crate::store::{create_pool, ensure_schema};

    async fn seeded_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();
        for (name, slug, price, category, featured) in [
            ("Black Tee", "black-tee", 19.99, Category::Unisex, true),
            ("White Tee", "white-tee", 24.99, Category::Men, false),
            ("Red Tee", "red-tee", 14.99, Category::Women, false),
        ] {
            let mut p = Product::new(
                name.into(),
                slug.into(),
                "desc".into(),
                price,
                category,
                vec![Size::M],
                vec![],
                vec!["/uploads/a.png".into()],
                10,
                featured,
            );
            p.featured = featured;
            p.insert(&pool).await.unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn filters_by_category_and_featured() {
        let pool = seeded_pool().await;

        let q = ProductQuery {
            category: Some("men".into()),
            ..Default::default()
        };
        let rows = list_products(&pool, &q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "White Tee");

        let q = ProductQuery {
            featured: Some("true".into()),
            ..Default::default()
        };
        let rows = list_products(&pool, &q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Black Tee");

        let q = ProductQuery {
            category: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(list_products(&pool, &q).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn sorts_by_price() {
        let pool = seeded_pool().await;
        let q = ProductQuery {
            sort_by: Some("price-asc".into()),
            ..Default::default()
        };
        let rows = list_products(&pool, &q).await.unwrap();
        let prices: Vec<f64> = rows.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![14.99, 19.99, 24.99]);
    }

    #[tokio::test]
    async fn search_matches_substring_case_insensitively() {
        let pool = seeded_pool().await;
        let q = ProductQuery {
            search: Some("black".into()),
            ..Default::default()
        };
        let rows = list_products(&pool, &q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].slug, "black-tee");

        let q = ProductQuery {
            search: Some("100%".into()),
            ..Default::default()
        };
        assert!(list_products(&pool, &q).await.unwrap().is_empty());
    }
}
