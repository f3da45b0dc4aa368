use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use storefront::{app_router, create_pool, ensure_schema, AppState, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,tower_http=debug")),
        )
        .init();

    let settings = Settings::from_env();

    tokio::fs::create_dir_all(&settings.upload_dir).await?;
    if let Some(path) = settings
        .database_url
        .strip_prefix("sqlite:")
        .map(|p| p.split('?').next().unwrap_or(p))
    {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let pool = create_pool(&settings.database_url).await?;
    ensure_schema(&pool).await?;

    let addr = settings.addr();
    let state = AppState {
        pool,
        settings: Arc::new(settings),
    };

    tracing::info!("listening on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app_router(state)).await?;

    Ok(())
}
