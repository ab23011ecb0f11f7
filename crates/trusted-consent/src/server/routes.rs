//! HTTP routes and middleware stack.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, RawQuery, State},
    handler::HandlerWithoutStateExt,
    http::{HeaderValue, StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::{csrf, error_pages};
use crate::config::Config;
use crate::consent::{self, ConsentAdmin};
use crate::error::{AppError, AppResult};
use crate::models::ConsentChallenge;

/// Shared state for HTTP handlers.
pub struct AppState {
    pub admin: Arc<dyn ConsentAdmin>,
}

/// Query parameter carrying the consent challenge.
const CHALLENGE_PARAM: &str = "consent_challenge";

/// Create the HTTP router.
///
/// Everything is configured here once; nothing is mutated after startup.
pub fn create_router(admin: Arc<dyn ConsentAdmin>, config: &Config) -> Router {
    let state = Arc::new(AppState { admin });
    let csrf_config = Arc::new(config.csrf.clone());

    let static_files = ServeDir::new(&config.static_dir)
        .fallback(handle_not_found.into_service())
        .call_fallback_on_method_not_allowed(true);

    Router::new()
        .route("/health", get(health_check).fallback(handle_not_found))
        .route(
            "/consent",
            get(handle_consent)
                .route_layer(from_fn_with_state(csrf_config, csrf::csrf_protection))
                .fallback(handle_not_found),
        )
        .fallback_service(static_files)
        .layer(from_fn_with_state(config.environment, error_pages::render_error_pages))
        .layer(CatchPanicLayer::custom(error_pages::render_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "trusted-consent",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle_not_found() -> AppError {
    AppError::NotFound
}

/// `GET /consent`
///
/// Accept the pending consent request without showing a consent screen and
/// send the user agent on to wherever the provider says.
async fn handle_consent(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let raw = query.as_deref().and_then(|q| first_query_value(q, CHALLENGE_PARAM));

    let challenge = ConsentChallenge::parse(raw.as_deref()).ok_or(AppError::MissingChallenge)?;

    let redirect = consent::accept_trusted_consent(state.admin.as_ref(), &challenge)
        .await
        .inspect_err(|e| {
            tracing::warn!(challenge = %challenge, status = ?e.status(), error = %e, "Consent acceptance failed");
        })?;

    let location = HeaderValue::try_from(redirect.redirect_to.as_str())
        .map_err(|_| AppError::InvalidRedirect(redirect.redirect_to.clone()))?;

    tracing::info!(challenge = %challenge, "Accepted consent request");

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// First value of `name` in a raw query string. Repeated keys are not an error.
fn first_query_value(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
