/*!
 * Contributor-facing routes.
 */

use axum::{
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::community::SubmissionInput;
use crate::database::models::NewTranslation;
use crate::prompt_cache::CacheHealth;
use crate::rate_limit::{check_daily_submissions, client_key};
use crate::stats;
use crate::validation::validate_kikuyu_text;

use crate::server::error::{Result, ServerError};
use crate::server::extract::JsonOrForm;
use crate::server::session::ContributorSession;
use crate::server::state::SharedState;
use super::{current_user, serve_prompt};

/// Answer when a session tries to skip a prompt it does not hold
pub const PROMPT_NOT_HELD: &str = "This prompt is not currently assigned to you.";

pub const TRANSLATION_THANKS: &str = "Thank you! Your translation has been submitted for review.";

#[derive(Debug, Deserialize)]
pub struct TranslationForm {
    pub prompt_id: Option<i64>,
    pub kikuyu_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptSubmissionForm {
    #[serde(default)]
    pub text: String,
    pub category: Option<String>,
    pub difficulty_level: Option<String>,
}

/// Encouragement shown after a contributor's `count`-th translation
pub fn thank_you_suggestions(count: i64) -> Vec<&'static str> {
    let mut suggestions = Vec::new();
    if count == 1 {
        suggestions.push("Great start! Try a few more translations to get comfortable.");
    }
    if count > 0 && count % 5 == 0 {
        suggestions.push("You're doing great! Consider submitting your own English sentences.");
    }
    suggestions
}

/// Landing page data: totals and last week's activity
pub async fn index(State(state): State<SharedState>) -> Result<Json<Value>> {
    let overview = stats::overview(&state.repo).await?;
    let recent = stats::recent_activity(&state.repo).await?;
    let health = CacheHealth::classify(overview.prompts.available, state.cache.settings().min_cache_size);

    Ok(Json(json!({
        "service": "Kikuyu Translation Platform",
        "stats": {
            "total_translations": overview.translations.total,
            "approved_translations": overview.translations.approved,
            "contributors": overview.users,
            "available_prompts": overview.prompts.available,
        },
        "recent_activity": recent,
        "cache_health": health,
    })))
}

pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    match state.repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "version": version, "database": "connected" })),
        ),
        Err(e) => {
            log::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "version": version, "database": "unavailable" })),
            )
        }
    }
}

/// GET /translate
pub async fn get_prompt(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
) -> Result<Json<Value>> {
    let prompt = serve_prompt(&state, &session, None, "No prompts available").await?;
    Ok(Json(json!({ "prompt": prompt })))
}

/// POST /translate
pub async fn submit_translation(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
    headers: HeaderMap,
    JsonOrForm(form): JsonOrForm<TranslationForm>,
) -> Result<impl IntoResponse> {
    let prompt_id = form
        .prompt_id
        .ok_or_else(|| ServerError::BadRequest("Prompt ID required".to_string()))?;
    let kikuyu_text = validate_kikuyu_text(form.kikuyu_text.as_deref().unwrap_or(""))?;

    let user = current_user(&state, &session).await?;
    check_daily_submissions(&state.repo, user.id, state.config.limits.daily_submission_limit)
        .await?;

    let translation = state
        .repo
        .create_translation(NewTranslation {
            prompt_id,
            user_id: user.id,
            kikuyu_text,
            ip_address: Some(client_key(&headers)),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        })
        .await?;

    info!(
        "Translation {} submitted for prompt {} by user {}",
        translation.id, prompt_id, user.id
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "translation_id": translation.id,
            "message": TRANSLATION_THANKS,
        })),
    ))
}

pub async fn thank_you(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
) -> Result<Json<Value>> {
    let user = current_user(&state, &session).await?;
    let count = state.repo.count_user_translations(user.id, None).await?;

    Ok(Json(json!({
        "translation_count": count,
        "suggestions": thank_you_suggestions(count),
    })))
}

/// POST /skip-prompt/:prompt_id
pub async fn skip_prompt(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
    Path(prompt_id): Path<i64>,
) -> Result<Json<Value>> {
    if state.repo.get_prompt(prompt_id).await?.is_none() {
        return Err(ServerError::NotFound("Prompt not found".to_string()));
    }

    if !state.cache.release(prompt_id, &session.id).await? {
        return Err(ServerError::Conflict(PROMPT_NOT_HELD.to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Prompt skipped. You can get a new one!",
    })))
}

/// POST /submit-prompt
pub async fn submit_prompt(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
    headers: HeaderMap,
    JsonOrForm(form): JsonOrForm<PromptSubmissionForm>,
) -> Result<impl IntoResponse> {
    let receipt = state
        .community
        .submit(SubmissionInput {
            text: form.text,
            category: form.category,
            difficulty_level: form.difficulty_level,
            submitted_by: Some(session.id.clone()),
            client_ip: Some(client_key(&headers)),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}
