/*!
 * Route table and middleware layers.
 */

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde_json::json;
use std::time::Instant;

use crate::rate_limit::client_key;

use super::error::ServerError;
use super::handlers::{admin, api, public};
use super::session::{
    build_cookie, read_cookie, sign_session_id, verify_session_cookie, ContributorSession,
    ADMIN_COOKIE, SESSION_COOKIE,
};
use super::state::SharedState;

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found",
        })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": true,
            "message": "Method not allowed",
        })),
    )
}

/// Log method, path, status and latency of every request
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = started.elapsed().as_millis();
    if status.is_server_error() {
        warn!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed);
    } else {
        info!("{} {} -> {} ({} ms)", method, path, status.as_u16(), elapsed);
    }
    response
}

/// Attach the contributor session, issuing a signed cookie for new ones
pub async fn contributor_session(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let secret = state.config.secret_key();
    let session = read_cookie(request.headers(), SESSION_COOKIE)
        .and_then(|value| verify_session_cookie(secret, &value))
        .map(|id| ContributorSession { id, is_new: false })
        .unwrap_or_else(ContributorSession::fresh);

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    if session.is_new {
        let cookie = build_cookie(
            SESSION_COOKIE,
            &sign_session_id(secret, &session.id),
            state.config.security.user_session_hours * 3600,
            state.config.cookie_secure(),
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Per-client sliding window limit for `/api/*`
pub async fn api_rate_limit(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(request.headers());
    let decision = state.api_limiter.check(&client);

    if !decision.allowed {
        warn!("Rate limit exceeded for {}", client);
        return ServerError::TooManyRequests {
            message: "Rate limit exceeded. Please try again later.".to_string(),
            retry_after_secs: Some(decision.retry_after_secs),
        }
        .into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    response
}

/// Reject requests without a live admin session
pub async fn require_admin(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let admin = read_cookie(request.headers(), ADMIN_COOKIE)
        .and_then(|token| state.admin_sessions.validate(&token))
        .ok_or_else(|| ServerError::Unauthorized("Admin login required".to_string()))?;

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    let api_routes = Router::new()
        .route("/api/next-prompt", get(api::next_prompt))
        .route("/api/skip-prompt", post(api::skip_prompt))
        .route("/api/user-progress", get(api::user_progress))
        .route("/api/categories", get(api::categories))
        .route("/api/platform-stats", get(api::platform_stats))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            api_rate_limit,
        ));

    let admin_routes = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/", get(admin::dashboard))
        .route("/admin/translations", get(admin::translations))
        .route("/admin/translation/:id/moderate", post(admin::moderate))
        .route("/admin/cache-status", get(admin::cache_status))
        .route("/admin/refill-cache", post(admin::refill_cache))
        .route("/admin/test-connection", post(admin::test_connection))
        .route("/admin/export", get(admin::export))
        .route("/admin/stats", get(admin::detailed_stats))
        .route("/admin/submissions", get(admin::submissions))
        .route("/admin/submission/:id/review", post(admin::review_submission))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .route("/", get(public::index))
        .route("/health", get(public::health))
        .route("/translate", get(public::get_prompt).post(public::submit_translation))
        .route("/thank-you", get(public::thank_you))
        .route("/skip-prompt/:prompt_id", post(public::skip_prompt))
        .route("/submit-prompt", post(public::submit_prompt))
        .route("/admin/login", post(admin::login))
        .route("/admin/logout", get(admin::logout).post(admin::logout))
        .merge(api_routes)
        .merge(admin_routes)
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            contributor_session,
        ))
        .layer(axum_middleware::from_fn(log_requests))
        .with_state(state)
}
