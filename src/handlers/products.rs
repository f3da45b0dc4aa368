//! Catalog handlers. Create and update accept multipart forms because they
//! carry image files alongside text fields.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::product::{Category, Product, Size};
use crate::response;
use crate::service::catalog::{self, ProductQuery};
use crate::service::validation::{slugify, split_csv, validate_price};
use crate::state::AppState;
use crate::uploads::{read_product_form, ProductForm};

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let products = catalog::list_products(&state.pool, &query).await?;
    Ok(response::ok_many(products))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let product = Product::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(response::ok(product))
}

fn parse_sizes(raw: &str) -> Result<Vec<Size>, AppError> {
    split_csv(raw).iter().map(|s| Size::parse(s)).collect()
}

fn parse_bool_field(form: &ProductForm, name: &str) -> Option<bool> {
    match form.field(name) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

pub async fn create(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let form = read_product_form(multipart, &state.settings.upload_dir).await?;

    let name = form
        .field("name")
        .ok_or_else(|| AppError::Validation("name is required".into()))?
        .to_string();
    let description = form
        .field("description")
        .ok_or_else(|| AppError::Validation("description is required".into()))?
        .to_string();
    let price: f64 = form
        .field("price")
        .ok_or_else(|| AppError::Validation("price is required".into()))?
        .parse()
        .map_err(|_| AppError::Validation("price must be a number".into()))?;
    validate_price(price)?;
    let category = Category::parse(
        form.field("category")
            .ok_or_else(|| AppError::Validation("category is required".into()))?,
    )?;
    let sizes = parse_sizes(form.field("sizes").unwrap_or_default())?;
    let colors = split_csv(form.field("colors").unwrap_or_default());
    let stock_quantity: i64 = match form.field("stockQuantity") {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Validation("stockQuantity must be an integer".into()))?,
        None => 100,
    };
    if stock_quantity < 0 {
        return Err(AppError::Validation("stockQuantity must not be negative".into()));
    }
    let featured = parse_bool_field(&form, "featured").unwrap_or(false);

    if form.image_paths.is_empty() {
        return Err(AppError::Validation("at least one image is required".into()));
    }

    let slug = match form.field("slug") {
        Some(s) => s.to_string(),
        None => slugify(&name),
    };
    if Product::slug_taken(&state.pool, &slug).await? {
        return Err(AppError::BadRequest(format!("slug '{slug}' is already in use")));
    }

    let product = Product::new(
        name,
        slug,
        description,
        price,
        category,
        sizes,
        colors,
        form.image_paths,
        stock_quantity,
        featured,
    );
    product.insert(&state.pool).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok(response::created(product))
}

/// Provided fields replace; new image parts append to the existing gallery.
pub async fn update(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut product = Product::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let form = read_product_form(multipart, &state.settings.upload_dir).await?;

    if let Some(name) = form.field("name") {
        product.name = name.to_string();
    }
    if let Some(description) = form.field("description") {
        product.description = description.to_string();
    }
    if let Some(raw) = form.field("price") {
        let price: f64 = raw
            .parse()
            .map_err(|_| AppError::Validation("price must be a number".into()))?;
        validate_price(price)?;
        product.price = price;
    }
    if let Some(raw) = form.field("category") {
        product.category = Category::parse(raw)?;
    }
    if let Some(raw) = form.field("sizes") {
        product.sizes.0 = parse_sizes(raw)?;
    }
    if let Some(raw) = form.field("colors") {
        product.colors.0 = split_csv(raw);
    }
    if let Some(raw) = form.field("stockQuantity") {
        let stock_quantity: i64 = raw
            .parse()
            .map_err(|_| AppError::Validation("stockQuantity must be an integer".into()))?;
        if stock_quantity < 0 {
            return Err(AppError::Validation("stockQuantity must not be negative".into()));
        }
        product.stock_quantity = stock_quantity;
        product.in_stock = stock_quantity > 0;
    }
    if let Some(v) = parse_bool_field(&form, "featured") {
        product.featured = v;
    }
    if let Some(v) = parse_bool_field(&form, "inStock") {
        product.in_stock = v;
    }
    if let Some(v) = parse_bool_field(&form, "onSale") {
        product.on_sale = v;
    }
    product.images.0.extend(form.image_paths);

    product.save(&state.pool).await?;
    Ok(response::ok(product))
}

pub async fn delete(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if !Product::delete(&state.pool, &id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
