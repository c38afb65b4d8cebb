//! Request logging middleware.
//!
//! One line per request with method, route template, status and latency.
//! The route template (`/users/:id`) is logged instead of the raw path so
//! account ids stay out of the logs.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

/// Route template the request matched, or `"unmatched"`.
pub fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Logs server errors at WARN and everything else at INFO. Health checks are
/// skipped.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let route = route_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        warn!(%method, %route, status = status.as_u16(), latency_ms, "Request failed");
    } else {
        info!(%method, %route, status = status.as_u16(), latency_ms, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::to_bytes,
        http::StatusCode,
        middleware::from_fn,
        routing::{get, patch},
        Router,
    };
    use tower::ServiceExt;

    async fn echo_route(request: Request<Body>, next: Next) -> Response {
        let route = route_label(&request);
        let mut response = next.run(request).await;
        *response.body_mut() = Body::from(route);
        response
    }

    async fn body_text(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_route_label_hides_account_ids() {
        let app = Router::new()
            .route("/users/:id", patch(|| async { "ok" }))
            .layer(from_fn(echo_route));

        let (status, route) = body_text(
            app,
            "PATCH",
            "/users/0b6c1f6e-7f1e-4a57-9a51-4c1b8f0d2a11",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(route, "/users/:id");
    }

    #[tokio::test]
    async fn test_logging_passes_responses_through() {
        let app = Router::new()
            .route("/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
            .route("/health", get(|| async { "ok" }))
            .layer(from_fn(request_logging));

        let (status, body) = body_text(app.clone(), "GET", "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "boom");

        let (status, body) = body_text(app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
