//! Orders: line items and status fields are stored as JSON/text columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Stripe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// One line of an order. Name and price are copied from the product at
/// purchase time so later catalog edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub size: String,
    pub color: String,
    pub price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
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
}

/// Coupon applied at checkout, denormalized onto the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub code: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: Option<String>,
    pub items: Json<Vec<OrderItem>>,
    pub subtotal: f64,
    pub discount: Option<Json<AppliedDiscount>>,
    pub total_amount: f64,
    pub shipping_address: Json<ShippingAddress>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User summary embedded in admin order listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct OrderWithUser {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<UserSummary>,
}

/// Admin status update; absent fields are left untouched. Enum typing rejects
/// unknown status strings at deserialization.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderUpdate {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
}

impl Order {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, AppError> {
        let order = sqlx::query_as::<_, Self>("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(order)
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Self>, AppError> {
        let orders = sqlx::query_as::<_, Self>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(orders)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Self>, AppError> {
        let orders = sqlx::query_as::<_, Self>(
            "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(orders)
    }

    pub async fn apply_update(
        pool: &SqlitePool,
        id: &str,
        update: &OrderUpdate,
    ) -> Result<Option<Self>, AppError> {
        let Some(mut order) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        if let Some(s) = update.order_status {
            order.order_status = s;
        }
        if let Some(s) = update.payment_status {
            order.payment_status = s;
        }
        if let Some(t) = &update.tracking_number {
            order.tracking_number = Some(t.clone());
        }
        order.updated_at = Utc::now();
        sqlx::query(
            r#"
            UPDATE orders SET order_status = ?, payment_status = ?, tracking_number = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(order.order_status)
        .bind(order.payment_status)
        .bind(&order.tracking_number)
        .bind(order.updated_at)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(Some(order))
    }

    /// True when any of the user's orders contains the product. Drives the
    /// `verified` flag on reviews.
    pub async fn user_purchased_product(
        pool: &SqlitePool,
        user_id: &str,
        product_id: &str,
    ) -> Result<bool, AppError> {
        let (found,): (i64,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM orders, json_each(orders.items)
                WHERE orders.user_id = ?
                  AND json_extract(json_each.value, '$.productId') = ?
            )
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(pool)
        .await?;
        Ok(found != 0)
    }
}
