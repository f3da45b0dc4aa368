//! Coupon handlers: admin CRUD plus a public validation endpoint for carts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::coupon::{Coupon, CouponInput, CouponUpdate};
use crate::response;
use crate::service::validation::require_non_empty;
use crate::state::AppState;

pub async fn list(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let coupons = Coupon::list(&state.pool).await?;
    Ok(response::ok_many(coupons))
}

pub async fn create(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CouponInput>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    require_non_empty("code", &input.code)?;
    if input.value < 0.0 || !input.value.is_finite() {
        return Err(AppError::Validation("value must be a non-negative number".into()));
    }
    let code = input.code.trim().to_uppercase();
    if Coupon::code_taken(&state.pool, &code).await? {
        return Err(AppError::BadRequest(format!("coupon '{code}' already exists")));
    }

    let coupon = Coupon::new(input, code);
    coupon.insert(&state.pool).await?;
    Ok(response::created(coupon))
}

pub async fn update(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CouponUpdate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut coupon = Coupon::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("coupon {id}")))?;

    if let Some(v) = &update.description {
        coupon.description = Some(v.clone());
    }
    if let Some(v) = update.kind {
        coupon.kind = v;
    }
    if let Some(v) = update.value {
        if v < 0.0 || !v.is_finite() {
            return Err(AppError::Validation("value must be a non-negative number".into()));
        }
        coupon.value = v;
    }
    if let Some(v) = update.min_purchase {
        coupon.min_purchase = Some(v);
    }
    if let Some(v) = update.max_discount {
        coupon.max_discount = Some(v);
    }
    if let Some(v) = update.usage_limit {
        coupon.usage_limit = Some(v);
    }
    if let Some(v) = update.active {
        coupon.active = v;
    }
    if let Some(v) = update.starts_at {
        coupon.starts_at = Some(v);
    }
    if let Some(v) = update.ends_at {
        coupon.ends_at = Some(v);
    }

    coupon.save(&state.pool).await?;
    Ok(response::ok(coupon))
}

pub async fn delete(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if !Coupon::delete(&state.pool, &id).await? {
        return Err(AppError::NotFound(format!("coupon {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub subtotal: f64,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub code: String,
    pub discount: f64,
}

/// Dry-run check used by carts before checkout. Does not consume a use.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let code = body.code.trim().to_uppercase();
    let coupon = Coupon::find_by_code(&state.pool, &code)
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid coupon code".into()))?;
    let discount = coupon.discount_for(body.subtotal, Utc::now())?;
    Ok(response::ok(ValidateResponse { code, discount }))
}
