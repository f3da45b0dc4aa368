//! Business logic above the row modules.

pub mod catalog;
pub mod checkout;
pub mod validation;
