pub mod api;
pub mod common;

pub use api::app_router;
pub use common::common_routes;
