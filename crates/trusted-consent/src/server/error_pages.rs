//! Central error handling.
//!
//! Handlers and middleware return [`AppError`](crate::error::AppError), which
//! becomes a `500` carrying an [`ErrorReport`] extension. This layer is the only
//! place that logs those errors and renders them as HTML.

use std::any::Any;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};

use super::views;
use crate::config::Environment;
use crate::error::ErrorReport;

/// Render error reports produced further down the stack.
pub async fn render_error_pages(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<Arc<ErrorReport>>().cloned() else {
        return response;
    };

    if matches!(report.detail["kind"].as_str(), Some("admin_api" | "invalid_redirect")) {
        tracing::error!(%method, %path, message = %report.message, detail = %report.detail, "Request failed");
    } else {
        tracing::warn!(%method, %path, message = %report.message, "Request failed");
    }

    let detail = environment.is_development().then_some(&report.detail);
    let html = views::render_error_page(&report.message, detail);

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));

    Response::from_parts(parts, Body::from(html))
}

/// Last-resort handler for panics inside request handling.
///
/// The panic payload is JSON-stringified into the page message.
pub fn render_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());

    tracing::error!(panic = %message, "Request handler panicked");

    let stringified = serde_json::to_string_pretty(&serde_json::json!({ "panic": &message }))
        .unwrap_or(message);

    (StatusCode::INTERNAL_SERVER_ERROR, Html(views::render_error_page(&stringified, None)))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::Request;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use tower::ServiceExt;

    use crate::error::AppError;

    fn test_app(environment: Environment) -> Router {
        Router::new()
            .route("/fail", get(|| async { AppError::MissingChallenge }))
            .route("/ok", get(|| async { "fine" }))
            .layer(from_fn_with_state(environment, render_error_pages))
    }

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_error_rendered_as_html() {
        let response = test_app(Environment::Production)
            .oneshot(Request::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        let body = body_string(response).await;
        assert!(body.contains("Expected a consent challenge to be set but received none."));
        assert!(!body.contains("missing_challenge"));
    }

    #[tokio::test]
    async fn test_development_includes_detail() {
        let response = test_app(Environment::Development)
            .oneshot(Request::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_string(response).await;
        assert!(body.contains("missing_challenge"));
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let response = test_app(Environment::Development)
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "fine");
    }

    #[tokio::test]
    async fn test_panic_payload_is_stringified() {
        let response = render_panic(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_string(response).await;
        assert!(body.contains("&quot;panic&quot;: &quot;kaboom&quot;"));
    }
}
