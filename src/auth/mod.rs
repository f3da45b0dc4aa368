//! Authentication: password hashing, access tokens, request extractors.

pub mod extract;
pub mod password;
pub mod token;

pub use extract::{AdminUser, AuthUser};
pub use token::{issue_token, verify_token, Claims};
