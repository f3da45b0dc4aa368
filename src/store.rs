//! SQLite pool creation and idempotent schema DDL.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::AppError;

/// Single-row id for the store settings document.
pub const SETTINGS_ID: &str = "store_settings";

/// Create the connection pool. WAL mode and a busy timeout keep concurrent
/// request handlers from failing on writer contention; connect options apply
/// them to every pooled connection.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    // An in-memory database exists per connection, so it gets a pool of one.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::info!("sqlite pool created");
    Ok(pool)
}

/// Create all tables and seed rows. Safe to run on every startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            first_name TEXT,
            last_name TEXT,
            phone TEXT,
            addresses TEXT NOT NULL DEFAULT '[]',
            wishlist TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_login TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            price REAL NOT NULL,
            category TEXT NOT NULL,
            sizes TEXT NOT NULL DEFAULT '[]',
            colors TEXT NOT NULL DEFAULT '[]',
            images TEXT NOT NULL DEFAULT '[]',
            in_stock INTEGER NOT NULL DEFAULT 1,
            stock_quantity INTEGER NOT NULL DEFAULT 100,
            featured INTEGER NOT NULL DEFAULT 0,
            on_sale INTEGER NOT NULL DEFAULT 0,
            compare_at_price REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            order_number TEXT NOT NULL UNIQUE,
            user_id TEXT REFERENCES users(id),
            items TEXT NOT NULL,
            subtotal REAL NOT NULL,
            discount TEXT,
            total_amount REAL NOT NULL,
            shipping_address TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            payment_status TEXT NOT NULL DEFAULT 'pending',
            order_status TEXT NOT NULL DEFAULT 'processing',
            tracking_number TEXT,
            customer_notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id),
            username TEXT NOT NULL,
            rating INTEGER NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            verified INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            UNIQUE (product_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            parent_id TEXT,
            image TEXT,
            featured INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coupons (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            description TEXT,
            kind TEXT NOT NULL,
            value REAL NOT NULL,
            min_purchase REAL,
            max_discount REAL,
            usage_limit INTEGER,
            usage_count INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            starts_at TEXT,
            ends_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS store_settings (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Dense, human-readable order numbers. Bumped inside the checkout transaction.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_counter (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            next INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_product_id ON reviews(product_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category)")
        .execute(pool)
        .await?;

    sqlx::query("INSERT OR IGNORE INTO order_counter (id, next) VALUES (1, 1001)")
        .execute(pool)
        .await?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("INSERT OR IGNORE INTO store_settings (id, payload, updated_at) VALUES (?, ?, ?)")
        .bind(SETTINGS_ID)
        .bind(default_settings_payload().to_string())
        .bind(now)
        .execute(pool)
        .await?;

    tracing::info!("schema ensured");
    Ok(())
}

/// Seed document for a fresh database. Opaque payload: handlers store and
/// return it without interpreting anything beyond "is a JSON object".
fn default_settings_payload() -> serde_json::Value {
    serde_json::json!({
        "storeName": "Storefront",
        "contact": { "email": "", "phone": "", "address": "" },
        "social": {},
        "shipping": {
            "methods": [
                {
                    "id": "standard",
                    "name": "Standard Shipping",
                    "baseRate": 4.99,
                    "freeThreshold": 50.0
                }
            ],
            "countries": ["US"]
        },
        "tax": { "default": { "rate": 0.0625, "includedInPrices": false } }
    })
}
