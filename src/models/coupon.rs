//! Coupons. Discount math is flat arithmetic: a percentage of the subtotal
//! (optionally capped) or a fixed amount. No product or category targeting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CouponKind {
    Percentage,
    FixedAmount,
    FreeShipping,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    pub value: f64,
    pub min_purchase: Option<f64>,
    pub max_discount: Option<f64>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CouponInput {
    pub code: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    pub value: f64,
    pub min_purchase: Option<f64>,
    pub max_discount: Option<f64>,
    pub usage_limit: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CouponUpdate {
    pub description: Option<String>,
    pub kind: Option<CouponKind>,
    pub value: Option<f64>,
    pub min_purchase: Option<f64>,
    pub max_discount: Option<f64>,
    pub usage_limit: Option<i64>,
    pub active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn new(input: CouponInput, code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            code,
            description: input.description,
            kind: input.kind,
            value: input.value,
            min_purchase: input.min_purchase,
            max_discount: input.max_discount,
            usage_limit: input.usage_limit,
            usage_count: 0,
            active: input.active,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Discount for `subtotal` at `now`, or the reason the coupon is unusable.
    pub fn discount_for(&self, subtotal: f64, now: DateTime<Utc>) -> Result<f64, AppError> {
        if !self.active {
            return Err(AppError::BadRequest("coupon is not active".into()));
        }
        if let Some(starts) = self.starts_at {
            if now < starts {
                return Err(AppError::BadRequest("coupon is not active yet".into()));
            }
        }
        if let Some(ends) = self.ends_at {
            if now > ends {
                return Err(AppError::BadRequest("coupon has expired".into()));
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.usage_count >= limit {
                return Err(AppError::BadRequest("coupon usage limit reached".into()));
            }
        }
        if let Some(min) = self.min_purchase {
            if subtotal < min {
                return Err(AppError::BadRequest(format!(
                    "minimum purchase of {min:.2} not met"
                )));
            }
        }
        let amount = match self.kind {
            CouponKind::Percentage => {
                let raw = subtotal * self.value / 100.0;
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            CouponKind::FixedAmount => self.value.min(subtotal),
            // Shipping is not priced server-side; the coupon validates but
            // contributes nothing to the item total.
            CouponKind::FreeShipping => 0.0,
        };
        Ok(amount)
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO coupons (id, code, description, kind, value, min_purchase, max_discount,
                                 usage_limit, usage_count, active, starts_at, ends_at,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.code)
        .bind(&self.description)
        .bind(self.kind)
        .bind(self.value)
        .bind(self.min_purchase)
        .bind(self.max_discount)
        .bind(self.usage_limit)
        .bind(self.usage_count)
        .bind(self.active)
        .bind(self.starts_at)
        .bind(self.ends_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<Self>, AppError> {
        let coupons = sqlx::query_as::<_, Self>("SELECT * FROM coupons ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(coupons)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, AppError> {
        let coupon = sqlx::query_as::<_, Self>("SELECT * FROM coupons WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(coupon)
    }

    pub async fn find_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Self>, AppError> {
        let coupon = sqlx::query_as::<_, Self>("SELECT * FROM coupons WHERE code = ?")
            .bind(code)
            .fetch_optional(pool)
            .await?;
        Ok(coupon)
    }

    pub async fn code_taken(pool: &SqlitePool, code: &str) -> Result<bool, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coupons WHERE code = ?")
            .bind(code)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE coupons
            SET description = ?, kind = ?, value = ?, min_purchase = ?, max_discount = ?,
                usage_limit = ?, active = ?, starts_at = ?, ends_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.description)
        .bind(self.kind)
        .bind(self.value)
        .bind(self.min_purchase)
        .bind(self.max_discount)
        .bind(self.usage_limit)
        .bind(self.active)
        .bind(self.starts_at)
        .bind(self.ends_at)
        .bind(Utc::now())
        .bind(&self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: CouponKind, value: f64) -> Coupon {
        Coupon::new(
            CouponInput {
                code: "TEST".into(),
                description: None,
                kind,
                value,
                min_purchase: None,
                max_discount: None,
                usage_limit: None,
                active: true,
                starts_at: None,
                ends_at: None,
            },
            "TEST".into(),
        )
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut c = coupon(CouponKind::Percentage, 25.0);
        c.max_discount = Some(10.0);
        let now = Utc::now();
        assert_eq!(c.discount_for(100.0, now).unwrap(), 10.0);
        assert_eq!(c.discount_for(20.0, now).unwrap(), 5.0);
    }

    #[test]
    fn fixed_amount_never_exceeds_subtotal() {
        let c = coupon(CouponKind::FixedAmount, 15.0);
        assert_eq!(c.discount_for(10.0, Utc::now()).unwrap(), 10.0);
    }

    #[test]
    fn window_and_limits_are_enforced() {
        let now = Utc::now();

        let mut c = coupon(CouponKind::Percentage, 10.0);
        c.ends_at = Some(now - Duration::days(1));
        assert!(c.discount_for(100.0, now).is_err());

        let mut c = coupon(CouponKind::Percentage, 10.0);
        c.starts_at = Some(now + Duration::days(1));
        assert!(c.discount_for(100.0, now).is_err());

        let mut c = coupon(CouponKind::Percentage, 10.0);
        c.usage_limit = Some(5);
        c.usage_count = 5;
        assert!(c.discount_for(100.0, now).is_err());

        let mut c = coupon(CouponKind::Percentage, 10.0);
        c.min_purchase = Some(50.0);
        assert!(c.discount_for(49.99, now).is_err());
        assert!(c.discount_for(50.0, now).is_ok());

        let mut c = coupon(CouponKind::Percentage, 10.0);
        c.active = false;
        assert!(c.discount_for(100.0, now).is_err());
    }

    #[test]
    fn free_shipping_contributes_nothing() {
        let c = coupon(CouponKind::FreeShipping, 0.0);
        assert_eq!(c.discount_for(100.0, Utc::now()).unwrap(), 0.0);
    }
}
