//! Review handlers: public listing, authenticated submission, admin moderation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::models::order::Order;
use crate::models::product::Product;
use crate::models::review::{Review, ReviewStatus};
use crate::response;
use crate::service::validation::{require_non_empty, validate_rating};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub rating: i64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerationInput {
    pub status: ReviewStatus,
}

pub async fn list_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Product::find_by_id(&state.pool, &product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    let reviews = Review::list_approved(&state.pool, &product_id).await?;
    Ok(response::ok_many(reviews))
}

pub async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(input): Json<ReviewInput>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Product::find_by_id(&state.pool, &product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    validate_rating(input.rating)?;
    require_non_empty("title", &input.title)?;
    require_non_empty("body", &input.body)?;

    if Review::exists_for(&state.pool, &product_id, &user.id).await? {
        return Err(AppError::BadRequest(
            "you have already reviewed this product".into(),
        ));
    }

    let verified = Order::user_purchased_product(&state.pool, &user.id, &product_id).await?;
    let review = Review::new(
        product_id,
        user.id.clone(),
        user.username.clone(),
        input.rating,
        input.title,
        input.body,
        verified,
    );
    review.insert(&state.pool).await?;
    Ok(response::created(review))
}

pub async fn moderate(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ModerationInput>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let review = Review::set_status(&state.pool, &id, input.status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {id}")))?;
    Ok(response::ok(review))
}

pub async fn delete(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if !Review::delete(&state.pool, &id).await? {
        return Err(AppError::NotFound(format!("review {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
