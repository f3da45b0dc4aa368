//! Order placement. The whole flow runs in one transaction: per-line stock is
//! re-validated and decremented with a conditional UPDATE, the optional coupon
//! is applied, and the client-supplied total is checked against the
//! recomputed one. Any rejection rolls everything back, so stock never moves
//! for a failed order.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{
    AppliedDiscount, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::models::coupon::Coupon;
use crate::models::product::Product;

/// Tolerance when comparing the client total to the recomputed one.
pub const TOTAL_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
    pub size: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub total_amount: f64,
    /// Absent for guest checkout.
    pub user_id: Option<String>,
    pub coupon_code: Option<String>,
    pub customer_notes: Option<String>,
}

pub async fn place_order(pool: &SqlitePool, req: CheckoutRequest) -> Result<Order, AppError> {
    if req.items.is_empty() {
        return Err(AppError::Validation("order must contain at least one item".into()));
    }
    for item in &req.items {
        if item.quantity < 1 {
            return Err(AppError::Validation("quantity must be at least 1".into()));
        }
    }

    let mut tx = pool.begin().await?;

    // Write first: allocating the order number upgrades this transaction to a
    // writer immediately, so overlapping checkouts queue on the busy timeout
    // instead of failing later on a stale read snapshot.
    let order_number = next_order_number(&mut *tx).await?;

    if let Some(user_id) = &req.user_id {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if count == 0 {
            return Err(AppError::BadRequest("user not found".into()));
        }
    }

    let mut subtotal = 0.0;
    let mut line_items = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(&item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("product {} not found", item.product_id)))?;

        if !product.in_stock || product.stock_quantity < item.quantity {
            return Err(AppError::BadRequest(format!(
                "product {} is out of stock or insufficient quantity",
                product.name
            )));
        }

        decrement_stock(&mut *tx, &product, item.quantity).await?;

        let line_subtotal = product.price * item.quantity as f64;
        subtotal += line_subtotal;
        line_items.push(OrderItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
            price: product.price,
            subtotal: line_subtotal,
        });
    }

    let discount = match &req.coupon_code {
        Some(code) => Some(apply_coupon(&mut *tx, code, subtotal).await?),
        None => None,
    };
    let discount_amount = discount.as_ref().map(|d| d.amount).unwrap_or(0.0);

    let expected_total = subtotal - discount_amount;
    if (expected_total - req.total_amount).abs() > TOTAL_EPSILON {
        return Err(AppError::BadRequest(
            "total amount does not match calculated total".into(),
        ));
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4().to_string(),
        order_number,
        user_id: req.user_id,
        items: sqlx::types::Json(line_items),
        subtotal,
        discount: discount.map(sqlx::types::Json),
        total_amount: req.total_amount,
        shipping_address: sqlx::types::Json(req.shipping_address),
        payment_method: req.payment_method,
        payment_status: PaymentStatus::Pending,
        order_status: OrderStatus::Processing,
        tracking_number: None,
        customer_notes: req.customer_notes,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO orders (id, order_number, user_id, items, subtotal, discount, total_amount,
                            shipping_address, payment_method, payment_status, order_status,
                            tracking_number, customer_notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(&order.items)
    .bind(order.subtotal)
    .bind(&order.discount)
    .bind(order.total_amount)
    .bind(&order.shipping_address)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.order_status)
    .bind(&order.tracking_number)
    .bind(&order.customer_notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(order_number = %order.order_number, total = order.total_amount, "order placed");
    Ok(order)
}

/// Guarded decrement: the `stock_quantity >= ?` predicate makes concurrent
/// oversell impossible even though the availability check above read an
/// earlier snapshot.
async fn decrement_stock(
    tx: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity - ?,
            in_stock = CASE WHEN stock_quantity - ? <= 0 THEN 0 ELSE in_stock END,
            updated_at = ?
        WHERE id = ? AND stock_quantity >= ?
        "#,
    )
    .bind(quantity)
    .bind(quantity)
    .bind(Utc::now())
    .bind(&product.id)
    .bind(quantity)
    .execute(tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(format!(
            "product {} is out of stock or insufficient quantity",
            product.name
        )));
    }
    Ok(())
}

async fn apply_coupon(
    tx: &mut SqliteConnection,
    code: &str,
    subtotal: f64,
) -> Result<AppliedDiscount, AppError> {
    let code = code.trim().to_uppercase();
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?")
        .bind(&code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid coupon code".into()))?;

    let amount = coupon.discount_for(subtotal, Utc::now())?;

    // The usage_count guard closes the window between the read above and this
    // write under concurrent checkouts.
    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET usage_count = usage_count + 1, updated_at = ?
        WHERE id = ? AND (usage_limit IS NULL OR usage_count < usage_limit)
        "#,
    )
    .bind(Utc::now())
    .bind(&coupon.id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest("coupon usage limit reached".into()));
    }

    Ok(AppliedDiscount { code, amount })
}

async fn next_order_number(tx: &mut SqliteConnection) -> Result<String, AppError> {
    let (number,): (i64,) =
        sqlx::query_as("UPDATE order_counter SET next = next + 1 WHERE id = 1 RETURNING next - 1")
            .fetch_one(&mut *tx)
            .await?;
    Ok(format!("ORD-{number}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coupon::{CouponInput, CouponKind};
    use crate::models::product::{Category, Size};
    use crate::store::{create_pool, ensure_schema};

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            address: "123 Main St".into(),
            apartment: None,
            city: "Springfield".into(),
            state: "IL".into(),
            postal_code: "62701".into(),
            country: "US".into(),
            phone: "+1555".into(),
        }
    }

    fn request(product_id: &str, quantity: i64, total: f64) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![CheckoutItem {
                product_id: product_id.into(),
                quantity,
                size: "M".into(),
                color: "black".into(),
            }],
            shipping_address: address(),
            payment_method: PaymentMethod::Stripe,
            total_amount: total,
            user_id: None,
            coupon_code: None,
            customer_notes: None,
        }
    }

    async fn pool_with_product(price: f64, stock: i64) -> (SqlitePool, Product) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        ensure_schema(&pool).await.unwrap();
        let product = Product::new(
            "Classic Tee".into(),
            "classic-tee".into(),
            "desc".into(),
            price,
            Category::Unisex,
            vec![Size::M],
            vec!["black".into()],
            vec!["/uploads/a.png".into()],
            stock,
            false,
        );
        product.insert(&pool).await.unwrap();
        (pool, product)
    }

    async fn stock_of(pool: &SqlitePool, id: &str) -> (i64, bool) {
        let p = Product::find_by_id(pool, id).await.unwrap().unwrap();
        (p.stock_quantity, p.in_stock)
    }

    #[tokio::test]
    async fn successful_order_decrements_stock_and_numbers_sequentially() {
        let (pool, product) = pool_with_product(24.99, 10).await;

        let order = place_order(&pool, request(&product.id, 2, 49.98)).await.unwrap();
        assert_eq!(order.order_number, "ORD-1001");
        assert_eq!(order.items.0.len(), 1);
        assert_eq!(order.items.0[0].subtotal, 49.98);
        assert_eq!(stock_of(&pool, &product.id).await, (8, true));

        let order = place_order(&pool, request(&product.id, 1, 24.99)).await.unwrap();
        assert_eq!(order.order_number, "ORD-1002");
    }

    #[tokio::test]
    async fn depleting_stock_clears_in_stock_flag() {
        let (pool, product) = pool_with_product(10.0, 3).await;
        place_order(&pool, request(&product.id, 3, 30.0)).await.unwrap();
        assert_eq!(stock_of(&pool, &product.id).await, (0, false));

        let err = place_order(&pool, request(&product.id, 1, 10.0)).await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn insufficient_stock_rejects_and_leaves_stock_unchanged() {
        let (pool, product) = pool_with_product(10.0, 2).await;
        let err = place_order(&pool, request(&product.id, 5, 50.0)).await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        assert_eq!(stock_of(&pool, &product.id).await, (2, true));
    }

    #[tokio::test]
    async fn mismatched_total_rolls_back_stock() {
        let (pool, product) = pool_with_product(24.99, 10).await;
        let err = place_order(&pool, request(&product.id, 2, 10.00)).await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        // The decrement happened inside the transaction and must be undone.
        assert_eq!(stock_of(&pool, &product.id).await, (10, true));
    }

    #[tokio::test]
    async fn total_within_epsilon_is_accepted() {
        let (pool, product) = pool_with_product(24.99, 10).await;
        place_order(&pool, request(&product.id, 2, 49.985)).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_product_and_unknown_user_reject() {
        let (pool, product) = pool_with_product(10.0, 5).await;

        let err = place_order(&pool, request("missing-id", 1, 10.0)).await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));

        let mut req = request(&product.id, 1, 10.0);
        req.user_id = Some("missing-user".into());
        let err = place_order(&pool, req).await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        assert_eq!(stock_of(&pool, &product.id).await, (5, true));
    }

    #[tokio::test]
    async fn coupon_discounts_and_counts_usage() {
        let (pool, product) = pool_with_product(50.0, 10).await;
        let coupon = Coupon::new(
            CouponInput {
                code: "WELCOME10".into(),
                description: None,
                kind: CouponKind::Percentage,
                value: 10.0,
                min_purchase: None,
                max_discount: None,
                usage_limit: Some(1),
                active: true,
                starts_at: None,
                ends_at: None,
            },
            "WELCOME10".into(),
        );
        coupon.insert(&pool).await.unwrap();

        let mut req = request(&product.id, 2, 90.0);
        req.coupon_code = Some("welcome10".into());
        let order = place_order(&pool, req).await.unwrap();
        assert_eq!(order.discount.as_ref().unwrap().0.amount, 10.0);

        let stored = Coupon::find_by_code(&pool, "WELCOME10").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);

        // Limit is 1, so a second use fails and rolls back its decrement.
        let mut req = request(&product.id, 2, 90.0);
        req.coupon_code = Some("WELCOME10".into());
        let err = place_order(&pool, req).await;
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        assert_eq!(stock_of(&pool, &product.id).await, (8, true));
    }

    #[tokio::test]
    async fn overlapping_orders_on_a_shared_database_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("store.db").display());
        let pool = create_pool(&url).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let product = Product::new(
            "Classic Tee".into(),
            "classic-tee".into(),
            "desc".into(),
            10.0,
            Category::Unisex,
            vec![Size::M],
            vec!["black".into()],
            vec!["/uploads/a.png".into()],
            10,
            false,
        );
        product.insert(&pool).await.unwrap();

        // Two checkouts race on separate pooled connections; neither may see
        // a lock error, and both decrements must land.
        let (a, b) = tokio::join!(
            place_order(&pool, request(&product.id, 1, 10.0)),
            place_order(&pool, request(&product.id, 1, 10.0)),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        let mut numbers = vec![a.order_number, b.order_number];
        numbers.sort();
        assert_eq!(numbers, vec!["ORD-1001".to_string(), "ORD-1002".to_string()]);
        assert_eq!(stock_of(&pool, &product.id).await, (8, true));
    }

    #[tokio::test]
    async fn empty_and_invalid_items_reject() {
        let (pool, product) = pool_with_product(10.0, 5).await;

        let mut req = request(&product.id, 1, 10.0);
        req.items.clear();
        assert!(matches!(
            place_order(&pool, req).await,
            Err(AppError::Validation(_))
        ));

        let req = request(&product.id, 0, 0.0);
        assert!(matches!(
            place_order(&pool, req).await,
            Err(AppError::Validation(_))
        ));
    }
}
