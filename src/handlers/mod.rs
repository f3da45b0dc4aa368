//! Request handlers, one module per resource.

pub mod categories;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod users;
