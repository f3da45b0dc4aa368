//! Store settings: a single opaque JSON document.

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::Value;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::response;
use crate::state::AppState;
use crate::store::SETTINGS_ID;

pub async fn get(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (payload,): (String,) = sqlx::query_as("SELECT payload FROM store_settings WHERE id = ?")
        .bind(SETTINGS_ID)
        .fetch_one(&state.pool)
        .await?;
    let doc: Value = serde_json::from_str(&payload)
        .map_err(|e| AppError::Internal(format!("settings payload: {e}")))?;
    Ok(response::ok(doc))
}

/// Full replacement; only the shape (a JSON object) is enforced.
pub async fn put(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if !body.is_object() {
        return Err(AppError::Validation("settings must be a JSON object".into()));
    }
    sqlx::query("UPDATE store_settings SET payload = ?, updated_at = ? WHERE id = ?")
        .bind(body.to_string())
        .bind(Utc::now())
        .bind(SETTINGS_ID)
        .execute(&state.pool)
        .await?;
    Ok(response::ok(body))
}
