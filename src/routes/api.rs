//! The application router: /api endpoints, static uploads, and the layer stack.

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::error_logging;
use crate::routes::common::common_routes;
use crate::state::AppState;

/// Multipart product uploads carry up to five images at 5 MiB each.
const MAX_BODY_BYTES: usize = 30 * 1024 * 1024;

fn user_routes() -> Router<AppState> {
    use handlers::users;
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/profile", get(users::profile).patch(users::update_profile))
        .route("/wishlist", get(users::wishlist))
        .route(
            "/wishlist/:product_id",
            post(users::wishlist_add).delete(users::wishlist_remove),
        )
}

fn product_routes() -> Router<AppState> {
    use handlers::{products, reviews};
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/:id",
            get(products::get)
                .patch(products::update)
                .delete(products::delete),
        )
        .route(
            "/:id/reviews",
            get(reviews::list_for_product).post(reviews::create),
        )
}

fn review_routes() -> Router<AppState> {
    use handlers::reviews;
    Router::new().route(
        "/:id",
        axum::routing::patch(reviews::moderate).delete(reviews::delete),
    )
}

fn order_routes() -> Router<AppState> {
    use handlers::orders;
    Router::new()
        .route("/", post(orders::create).get(orders::list_all))
        .route("/mine", get(orders::list_mine))
        .route("/:id", get(orders::get).patch(orders::update))
}

fn category_routes() -> Router<AppState> {
    use handlers::categories;
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route(
            "/:id",
            axum::routing::patch(categories::update).delete(categories::delete),
        )
}

fn coupon_routes() -> Router<AppState> {
    use handlers::coupons;
    Router::new()
        .route("/", get(coupons::list).post(coupons::create))
        .route("/validate", post(coupons::validate))
        .route(
            "/:id",
            axum::routing::patch(coupons::update).delete(coupons::delete),
        )
}

fn settings_routes() -> Router<AppState> {
    use handlers::settings;
    Router::new().route("/", get(settings::get).put(settings::put))
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let api = Router::new()
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/reviews", review_routes())
        .nest("/orders", order_routes())
        .nest("/categories", category_routes())
        .nest("/coupons", coupon_routes())
        .nest("/settings", settings_routes());

    Router::new()
        .merge(common_routes())
        .nest("/api", api)
        .nest_service(
            "/uploads",
            ServeDir::new(state.settings.upload_dir.clone()),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(error_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use crate::auth::issue_token;
    use crate::models::product::{Category, Product, Size};
    use crate::models::user::User;
    use crate::settings::Settings;
    use crate::store::{create_pool, ensure_schema};

    async fn test_state(dir: &tempfile::TempDir) -> AppState {
        let settings = Settings::for_tests(dir.path().to_path_buf());
        let pool = create_pool(&settings.database_url).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        AppState {
            pool,
            settings: Arc::new(settings),
        }
    }

    async fn admin_token(state: &AppState) -> String {
        let mut user = User::new("root".into(), "root@example.com".into(), "hash".into());
        user.is_admin = true;
        user.insert(&state.pool).await.unwrap();
        issue_token(&user.id, &state.settings.jwt_secret).unwrap()
    }

    fn patch_form_field(uri: &str, token: &str, field: &str, value: &str) -> Request<Body> {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{boundary}--\r\n"
        );
        Request::builder()
            .method("PATCH")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn shipping_address() -> Value {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "address": "1 Analytical Way",
            "city": "London",
            "state": "LDN",
            "postalCode": "SW1A",
            "country": "UK",
            "phone": "555-0100"
        })
    }

    fn tee(stock: i64) -> Product {
        Product::new(
            "Classic Tee".into(),
            "classic-tee".into(),
            "a shirt".into(),
            24.99,
            Category::Unisex,
            vec![Size::M],
            vec!["black".into()],
            vec!["/uploads/tee.png".into()],
            stock,
            false,
        )
    }

    #[tokio::test]
    async fn health_and_version_respond() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(&dir).await);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "storefront");
    }

    #[tokio::test]
    async fn registering_a_duplicate_email_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(&dir).await);

        let payload = json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "correct horse"
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/users/register", payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert!(body["data"]["token"].is_string());

        let response = app
            .oneshot(post_json("/api/users/register", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("user already exists"));
    }

    #[tokio::test]
    async fn login_with_wrong_password_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(&dir).await);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/users/register",
                json!({"username": "ada", "email": "ada@example.com", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_json(
                "/api/users/login",
                json!({"email": "ada@example.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("invalid credentials"));
    }

    #[tokio::test]
    async fn insufficient_stock_returns_400_and_leaves_stock_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let product = tee(2);
        product.insert(&state.pool).await.unwrap();
        let app = app_router(state.clone());

        let payload = json!({
            "items": [{"productId": product.id, "quantity": 5, "size": "m", "color": "black"}],
            "shippingAddress": shipping_address(),
            "paymentMethod": "credit_card",
            "totalAmount": 124.95
        });
        let response = app.oneshot(post_json("/api/orders", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let after = Product::find_by_id(&state.pool, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.stock_quantity, 2);
    }

    #[tokio::test]
    async fn guest_checkout_creates_an_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let product = tee(10);
        product.insert(&state.pool).await.unwrap();
        let app = app_router(state.clone());

        let payload = json!({
            "items": [{"productId": product.id, "quantity": 2, "size": "m", "color": "black"}],
            "shippingAddress": shipping_address(),
            "paymentMethod": "credit_card",
            "totalAmount": 49.98
        });
        let response = app.oneshot(post_json("/api/orders", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["orderNumber"], "ORD-1001");
        assert!(body["data"]["userId"].is_null());

        let after = Product::find_by_id(&state.pool, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.stock_quantity, 8);
    }

    #[tokio::test]
    async fn admin_only_routes_reject_anonymous_and_regular_users() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let app = app_router(state.clone());

        // No token at all.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // A regular user's token.
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/users/register",
                json!({"username": "ada", "email": "ada@example.com", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        let token = body_json(response).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/orders")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn product_update_rejects_negative_stock_and_syncs_in_stock() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let product = tee(5);
        product.insert(&state.pool).await.unwrap();
        let token = admin_token(&state).await;
        let app = app_router(state.clone());
        let uri = format!("/api/products/{}", product.id);

        let response = app
            .clone()
            .oneshot(patch_form_field(&uri, &token, "stockQuantity", "-5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let unchanged = Product::find_by_id(&state.pool, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.stock_quantity, 5);

        let response = app
            .oneshot(patch_form_field(&uri, &token, "stockQuantity", "0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let after = Product::find_by_id(&state.pool, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.stock_quantity, 0);
        assert!(!after.in_stock);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(&dir).await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/settings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["data"]["storeName"].is_string());
    }
}
