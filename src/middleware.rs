//! Response logging for 4xx/5xx statuses.

use axum::{extract::Request, middleware::Next, response::Response};

pub async fn error_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(%method, %uri, status = status.as_u16(), "server error");
    } else if status.is_client_error() {
        tracing::warn!(%method, %uri, status = status.as_u16(), "client error");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, http::StatusCode, routing::get, Router};
    use tower::util::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .layer(axum::middleware::from_fn(error_logging))
    }

    #[tokio::test]
    async fn passes_responses_through() {
        let response = app()
            .oneshot(HttpRequest::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
