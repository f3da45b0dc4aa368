//! Typed rows and their queries, one module per collection.

pub mod category;
pub mod coupon;
pub mod order;
pub mod product;
pub mod review;
pub mod user;
