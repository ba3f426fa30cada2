/*!
 * Admin panel routes.
 *
 * Everything except login and logout sits behind the admin session guard,
 * which attaches an `AdminIdentity` to the request.
 */

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::database::models::TranslationStatus;
use crate::export::{export_translations, ExportFormat};
use crate::moderation::ModerationAction;
use crate::stats;

use crate::server::error::{Result, ServerError};
use crate::server::extract::JsonOrForm;
use crate::server::session::{
    build_cookie, expired_cookie, read_cookie, AdminIdentity, ADMIN_COOKIE,
};
use crate::server::state::SharedState;

/// Name recorded in the audit log for the shared admin account
const ADMIN_ID: &str = "admin";

/// Pending submissions listed per request
const SUBMISSION_PAGE: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    pub action: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranslationsQuery {
    pub status: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionsQuery {
    pub category: Option<String>,
}

fn passwords_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// `None` for no filter (`all` or empty), 400 for unknown values
fn parse_status_filter(status: Option<&str>) -> Result<Option<TranslationStatus>> {
    match status.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value
            .parse::<TranslationStatus>()
            .map(Some)
            .map_err(|_| ServerError::BadRequest(format!("Invalid status: {}", value))),
    }
}

fn decision_notes(form: &DecisionForm) -> Option<String> {
    form.notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// POST /admin/login
pub async fn login(
    State(state): State<SharedState>,
    JsonOrForm(form): JsonOrForm<LoginForm>,
) -> Result<Response> {
    let password = form.password.unwrap_or_default();
    if !passwords_match(&password, state.config.admin_password()) {
        warn!("Failed admin login attempt");
        return Err(ServerError::Unauthorized("Invalid password".to_string()));
    }

    let token = state.admin_sessions.create(ADMIN_ID);
    let cookie = build_cookie(
        ADMIN_COOKIE,
        &token,
        state.admin_sessions.lifetime_secs(),
        state.config.cookie_secure(),
    );
    info!("Admin logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "message": "Login successful",
            "expires_in_hours": state.config.security.admin_session_hours,
        })),
    )
        .into_response())
}

/// GET or POST /admin/logout
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if let Some(token) = read_cookie(&headers, ADMIN_COOKIE) {
        if state.admin_sessions.revoke(&token) {
            info!("Admin logged out");
        }
    }

    (
        [(SET_COOKIE, expired_cookie(ADMIN_COOKIE, state.config.cookie_secure()))],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}

/// GET /admin/
pub async fn dashboard(State(state): State<SharedState>) -> Result<Json<Value>> {
    let overview = stats::overview(&state.repo).await?;
    let cache = state.cache.stats().await?;
    let recent = state.repo.list_translations(None, 10, 0).await?;
    let submissions = state.repo.submission_counts().await?;

    Ok(Json(json!({
        "overview": overview,
        "cache": cache,
        "recent_translations": recent,
        "pending_submissions": submissions.pending,
    })))
}

/// GET /admin/translations?status=&page=
pub async fn translations(
    State(state): State<SharedState>,
    Query(query): Query<TranslationsQuery>,
) -> Result<Json<Value>> {
    let status = parse_status_filter(query.status.as_deref())?;
    let per_page = state.config.limits.per_page;
    let page = query.page.unwrap_or(1).max(1);

    let total = state.repo.count_translations(status).await?;
    let items = state
        .repo
        .list_translations(status, per_page, (page - 1) * per_page)
        .await?;
    let total_pages = (total.max(0) as usize).div_ceil(per_page);

    Ok(Json(json!({
        "translations": items,
        "page": page,
        "per_page": per_page,
        "total": total,
        "total_pages": total_pages,
        "status": status.map_or_else(|| "all".to_string(), |s| s.to_string()),
    })))
}

/// POST /admin/translation/:id/moderate
pub async fn moderate(
    State(state): State<SharedState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(translation_id): Path<i64>,
    JsonOrForm(form): JsonOrForm<DecisionForm>,
) -> Result<Json<Value>> {
    let action: ModerationAction = form.action.as_deref().unwrap_or("").parse()?;
    let outcome = state
        .moderation
        .moderate(translation_id, action, &admin.admin_id, decision_notes(&form))
        .await?;
    Ok(Json(json!(outcome)))
}

/// GET /admin/cache-status
pub async fn cache_status(State(state): State<SharedState>) -> Result<Json<Value>> {
    let cache = state.cache.stats().await?;
    Ok(Json(json!({
        "cache": cache,
        "refill_in_progress": state.cache.refill_in_progress(),
        "batch_size": state.cache.settings().batch_size,
    })))
}

/// POST /admin/refill-cache
pub async fn refill_cache(State(state): State<SharedState>) -> Result<Json<Value>> {
    let outcome = state.cache.refill(true).await?;
    let cache = state.cache.stats().await?;

    Ok(Json(json!({
        "success": outcome.skipped_reason.is_none(),
        "outcome": outcome,
        "cache": cache,
    })))
}

/// POST /admin/test-connection
pub async fn test_connection(State(state): State<SharedState>) -> Result<Json<Value>> {
    match state.cache.test_connection().await {
        Ok(sample) => Ok(Json(json!({
            "success": true,
            "message": "Connection successful",
            "sample_prompt": sample,
        }))),
        Err(e) => {
            warn!("OpenRouter connection test failed: {}", e);
            Err(ServerError::ServiceUnavailable(format!(
                "Connection test failed: {}",
                e
            )))
        }
    }
}

/// GET /admin/export?format=&status=
pub async fn export(
    State(state): State<SharedState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let format = match query.format.as_deref() {
        None | Some("") => ExportFormat::default(),
        Some(value) => value
            .parse()
            .map_err(|e: anyhow::Error| ServerError::BadRequest(e.to_string()))?,
    };
    let status = parse_status_filter(query.status.as_deref())?;

    let file = export_translations(
        &state.repo,
        format,
        status,
        state.config.limits.max_export_records,
    )
    .await?;
    info!("Exported {} translations as {}", file.records, file.file_name);

    Ok((
        [
            (CONTENT_TYPE, file.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.body,
    )
        .into_response())
}

/// GET /admin/stats
pub async fn detailed_stats(State(state): State<SharedState>) -> Result<Json<Value>> {
    let overview = stats::overview(&state.repo).await?;
    let categories = stats::category_stats(&state.repo).await?;
    let recent = stats::recent_activity(&state.repo).await?;
    let submissions = state.community.stats().await?;
    let cache = state.cache.stats().await?;

    let db = state.repo.connection().clone();
    let database = tokio::task::spawn_blocking(move || db.stats())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(json!({
        "overview": overview,
        "categories": categories,
        "recent_activity": recent,
        "submissions": submissions,
        "cache": cache,
        "database": database,
        "uptime_secs": (chrono::Utc::now() - state.started_at).num_seconds(),
    })))
}

/// GET /admin/submissions?category=
pub async fn submissions(
    State(state): State<SharedState>,
    Query(query): Query<SubmissionsQuery>,
) -> Result<Json<Value>> {
    let category = query.category.filter(|c| !c.trim().is_empty());
    let pending = state.community.pending(SUBMISSION_PAGE, category).await?;

    Ok(Json(json!({
        "count": pending.len(),
        "submissions": pending,
    })))
}

/// POST /admin/submission/:id/review
pub async fn review_submission(
    State(state): State<SharedState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(submission_id): Path<i64>,
    JsonOrForm(form): JsonOrForm<DecisionForm>,
) -> Result<Json<Value>> {
    let notes = decision_notes(&form);
    let action = form.action.unwrap_or_default();
    let outcome = state
        .community
        .review(submission_id, &action, &admin.admin_id, notes)
        .await?;
    Ok(Json(json!(outcome)))
}
