//! Storefront: e-commerce REST backend over SQLite.
//!
//! Catalog, accounts, reviews, coupons, and transactional order placement,
//! served as JSON under `/api` with product images under `/uploads`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;
pub mod store;
pub mod uploads;

pub use error::AppError;
pub use routes::app_router;
pub use settings::Settings;
pub use state::AppState;
pub use store::{create_pool, ensure_schema};
