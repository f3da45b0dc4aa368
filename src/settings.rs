//! Runtime configuration from environment variables. `.env` is honored via dotenvy.

use std::path::PathBuf;

/// Server settings resolved once at startup and shared through [`crate::state::AppState`].
#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// sqlx connection string, e.g. `sqlite:./data/storefront.db?mode=rwc`.
    pub database_url: String,
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Directory product images are written to; served under `/uploads`.
    pub upload_dir: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/storefront.db?mode=rwc".into()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev_jwt_secret".into()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl Settings {
    /// In-memory database and a throwaway upload dir for tests.
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test_secret".into(),
            upload_dir,
        }
    }
}
