//! Account handlers: register, login, profile, wishlist.

use axum::{extract::Path, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{issue_token, password, AuthUser};
use crate::error::AppError;
use crate::models::product::Product;
use crate::models::user::{ProfileUpdate, User};
use crate::response;
use crate::service::validation::{
    require_non_empty, validate_email, validate_password, validate_username,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Identity plus a fresh access token, returned by register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub token: String,
}

fn auth_response(user: &User, token: String) -> AuthResponse {
    AuthResponse {
        id: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        is_admin: user.is_admin,
        token,
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_lowercase();
    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&body.password)?;

    if User::exists(&state.pool, &username, &email).await? {
        return Err(AppError::BadRequest("user already exists".into()));
    }

    let hash = password::hash_password(&body.password)?;
    let user = User::new(username, email, hash);
    user.insert(&state.pool).await?;

    let token = issue_token(&user.id, &state.settings.jwt_secret)?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(response::created(auth_response(&user, token)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let email = body.email.trim().to_lowercase();
    // One message for unknown email and wrong password.
    let invalid = || AppError::BadRequest("invalid credentials".into());

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid)?;
    if !password::verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    User::touch_last_login(&state.pool, &user.id).await?;
    let token = issue_token(&user.id, &state.settings.jwt_secret)?;
    Ok(response::ok(auth_response(&user, token)))
}

pub async fn profile(AuthUser(user): AuthUser) -> impl axum::response::IntoResponse {
    response::ok(user)
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Some(phone) = &update.phone {
        require_non_empty("phone", phone)?;
    }
    let updated = User::update_profile(&state.pool, &user.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;
    Ok(response::ok(updated))
}

pub async fn wishlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let products = Product::find_by_ids(&state.pool, &user.wishlist.0).await?;
    Ok(response::ok_many(products))
}

pub async fn wishlist_add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Product::find_by_id(&state.pool, &product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    let list = User::wishlist_add(&state.pool, &user.id, &product_id).await?;
    Ok(response::ok(list))
}

pub async fn wishlist_remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let list = User::wishlist_remove(&state.pool, &user.id, &product_id).await?;
    Ok(response::ok(list))
}
