//! Double-submit cookie CSRF protection.
//!
//! A random secret lives in an `HttpOnly`, `SameSite=Lax` cookie. Tokens are
//! `salt-base64url(sha256("salt-secret"))`, so any number of tokens can be
//! minted from one secret and checked without server-side storage.
//!
//! Safe methods are never rejected. Unsafe methods must present a token in one
//! of [`TOKEN_HEADERS`] or the `_csrf` query parameter.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::CsrfConfig;
use crate::error::AppError;

/// Headers a token may be presented in, checked in order.
pub const TOKEN_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

/// Query parameter a token may be presented in.
pub const TOKEN_QUERY_PARAM: &str = "_csrf";

const SALT_LEN: usize = 8;

/// Per-request access to the CSRF secret, inserted as a request extension.
#[derive(Clone)]
pub struct CsrfToken {
    secret: Arc<str>,
}

impl CsrfToken {
    fn new(secret: &str) -> Self {
        Self { secret: Arc::from(secret) }
    }

    /// Mint a fresh token for embedding in a form or header.
    #[must_use]
    pub fn generate(&self) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        create_token(&self.secret, &salt[..SALT_LEN])
    }

    /// Check a presented token against the secret.
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        let Some((salt, _)) = token.split_once('-') else {
            return false;
        };
        constant_time_eq(create_token(&self.secret, salt).as_bytes(), token.as_bytes())
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfToken").finish_non_exhaustive()
    }
}

fn create_token(secret: &str, salt: &str) -> String {
    let hash = Sha256::digest(format!("{salt}-{secret}").as_bytes());
    format!("{salt}-{}", URL_SAFE_NO_PAD.encode(hash))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn read_secret(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

fn presented_token(request: &Request) -> Option<String> {
    let from_header = TOKEN_HEADERS.iter().find_map(|name| {
        request.headers().get(*name).and_then(|v| v.to_str().ok()).map(str::to_owned)
    });

    from_header.or_else(|| {
        let query = request.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == TOKEN_QUERY_PARAM)
            .map(|(_, v)| v.into_owned())
    })
}

/// CSRF middleware, applied with `axum::middleware::from_fn_with_state`.
pub async fn csrf_protection(
    State(config): State<Arc<CsrfConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = read_secret(request.headers(), &config.cookie_name);
    let issue_cookie = existing.is_none();
    let secret = existing.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let token = CsrfToken::new(&secret);

    if !is_safe_method(request.method()) {
        let valid = !issue_cookie && presented_token(&request).is_some_and(|t| token.verify(&t));
        if !valid {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected request without a valid CSRF token"
            );
            return AppError::Csrf.into_response();
        }
    }

    request.extensions_mut().insert(token);
    let mut response = next.run(request).await;

    if issue_cookie {
        let cookie = Cookie::build((config.cookie_name.clone(), secret))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(config.secure)
            .build();

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode CSRF cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    use crate::error::ErrorReport;

    fn test_app() -> Router {
        Router::new()
            .route(
                "/form",
                get(|Extension(token): Extension<CsrfToken>| async move { token.generate() })
                    .post(|| async { "submitted" }),
            )
            .layer(from_fn_with_state(Arc::new(CsrfConfig::default()), csrf_protection))
    }

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    /// GET the form, returning the cookie pair and a token.
    async fn fetch_token(app: &Router) -> (String, String) {
        let response =
            app.clone().oneshot(Request::get("/form").body(Body::empty()).unwrap()).await.unwrap();
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap().to_string();
        (pair, body_string(response).await)
    }

    #[test]
    fn test_token_roundtrip_and_tamper() {
        let handle = CsrfToken::new("secret-a");
        let token = handle.generate();

        assert!(handle.verify(&token));
        assert!(!CsrfToken::new("secret-b").verify(&token));
        assert!(!handle.verify("no-separator-but-wrong"));
        assert!(!handle.verify("plain"));
    }

    #[tokio::test]
    async fn test_safe_request_issues_lax_cookie() {
        let response = test_app()
            .oneshot(Request::get("/form").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("_csrf="));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_existing_cookie_not_reissued() {
        let app = test_app();
        let (cookie, _) = fetch_token(&app).await;

        let response = app
            .oneshot(Request::get("/form").header(header::COOKIE, cookie).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_unsafe_request_without_token_rejected() {
        let app = test_app();
        let (cookie, _) = fetch_token(&app).await;

        let response = app
            .oneshot(
                Request::post("/form").header(header::COOKIE, cookie).body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<Arc<ErrorReport>>().unwrap();
        assert_eq!(report.message, "invalid csrf token");
    }

    #[tokio::test]
    async fn test_unsafe_request_with_header_token_accepted() {
        let app = test_app();
        let (cookie, token) = fetch_token(&app).await;

        let response = app
            .oneshot(
                Request::post("/form")
                    .header(header::COOKIE, cookie)
                    .header("x-csrf-token", token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "submitted");
    }

    #[tokio::test]
    async fn test_unsafe_request_with_query_token_accepted() {
        let app = test_app();
        let (cookie, token) = fetch_token(&app).await;

        let response = app
            .oneshot(
                Request::post(format!("/form?_csrf={token}"))
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_token_without_cookie_rejected() {
        let app = test_app();
        let (_, token) = fetch_token(&app).await;

        let response = app
            .oneshot(Request::post("/form").header("csrf-token", token).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
