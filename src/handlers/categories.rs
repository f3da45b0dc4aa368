//! Category handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::category::{Category, CategoryInput, CategoryUpdate};
use crate::response;
use crate::service::validation::{require_non_empty, slugify, validate_slug};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let categories = Category::list(&state.pool).await?;
    Ok(response::ok_many(categories))
}

pub async fn create(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    require_non_empty("name", &input.name)?;
    let slug = match &input.slug {
        Some(s) => s.clone(),
        None => slugify(&input.name),
    };
    validate_slug(&slug)?;
    if Category::slug_taken(&state.pool, &slug, None).await? {
        return Err(AppError::BadRequest(format!("slug '{slug}' is already in use")));
    }

    let category = Category::new(input, slug);
    category.insert(&state.pool).await?;
    Ok(response::created(category))
}

pub async fn update(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CategoryUpdate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut category = Category::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;

    if let Some(name) = &update.name {
        require_non_empty("name", name)?;
        category.name = name.clone();
    }
    if let Some(slug) = &update.slug {
        validate_slug(slug)?;
        if Category::slug_taken(&state.pool, slug, Some(&id)).await? {
            return Err(AppError::BadRequest(format!("slug '{slug}' is already in use")));
        }
        category.slug = slug.clone();
    }
    if let Some(v) = &update.description {
        category.description = Some(v.clone());
    }
    if let Some(v) = &update.parent_id {
        category.parent_id = Some(v.clone());
    }
    if let Some(v) = &update.image {
        category.image = Some(v.clone());
    }
    if let Some(v) = update.featured {
        category.featured = v;
    }
    if let Some(v) = update.sort_order {
        category.sort_order = v;
    }

    category.save(&state.pool).await?;
    Ok(response::ok(category))
}

pub async fn delete(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if !Category::delete(&state.pool, &id).await? {
        return Err(AppError::NotFound(format!("category {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
