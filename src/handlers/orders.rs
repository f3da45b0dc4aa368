//! Order handlers. Placement itself lives in `service::checkout`.

use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::HashMap;

use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::models::order::{Order, OrderUpdate, OrderWithUser, UserSummary};
use crate::models::user::User;
use crate::response;
use crate::service::checkout::{place_order, CheckoutRequest};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CheckoutRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let order = place_order(&state.pool, body).await?;
    Ok(response::created(order))
}

/// Admin listing with the buyer embedded, newest first.
pub async fn list_all(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let orders = Order::list_all(&state.pool).await?;

    let user_ids: Vec<String> = orders
        .iter()
        .filter_map(|o| o.user_id.clone())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    let mut users: HashMap<String, UserSummary> = HashMap::new();
    for id in &user_ids {
        if let Some(u) = User::find_by_id(&state.pool, id).await? {
            users.insert(
                id.clone(),
                UserSummary {
                    id: u.id,
                    username: u.username,
                    email: u.email,
                },
            );
        }
    }

    let rows: Vec<OrderWithUser> = orders
        .into_iter()
        .map(|order| {
            let user = order.user_id.as_ref().and_then(|id| users.get(id)).cloned();
            OrderWithUser { order, user }
        })
        .collect();
    Ok(response::ok_many(rows))
}

pub async fn list_mine(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let orders = Order::list_for_user(&state.pool, &user.id).await?;
    Ok(response::ok_many(orders))
}

pub async fn get(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let order = Order::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    // Guest orders carry no owner; any authenticated caller may look them up by id.
    if !user.is_admin {
        if let Some(owner) = &order.user_id {
            if *owner != user.id {
                return Err(AppError::Forbidden("not authorized to view this order".into()));
            }
        }
    }
    Ok(response::ok(order))
}

pub async fn update(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<OrderUpdate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let order = Order::apply_update(&state.pool, &id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    Ok(response::ok(order))
}
