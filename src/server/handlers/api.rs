/*!
 * JSON API under `/api/`.
 */

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::PromptStatus;
use crate::stats::{self, CategoryStats, PlatformStats, UserProgress};

use crate::server::error::{Result, ServerError};
use crate::server::extract::JsonOrForm;
use crate::server::session::ContributorSession;
use crate::server::state::SharedState;
use super::public::PROMPT_NOT_HELD;
use super::{current_user, serve_prompt, PromptPayload};

#[derive(Debug, Deserialize)]
pub struct NextPromptQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SkipRequest {
    pub prompt_id: Option<i64>,
}

/// GET /api/next-prompt?category=
pub async fn next_prompt(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
    Query(query): Query<NextPromptQuery>,
) -> Result<Json<PromptPayload>> {
    let category = query.category.filter(|c| !c.trim().is_empty());
    let prompt = serve_prompt(&state, &session, category, "No prompts available").await?;
    Ok(Json(prompt))
}

/// POST /api/skip-prompt, then serve the next prompt
pub async fn skip_prompt(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
    JsonOrForm(request): JsonOrForm<SkipRequest>,
) -> Result<Json<Value>> {
    let prompt_id = request
        .prompt_id
        .ok_or_else(|| ServerError::BadRequest("Prompt ID required".to_string()))?;

    let skipped = state
        .repo
        .get_prompt(prompt_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Prompt not found".to_string()))?;
    let held = skipped.status == PromptStatus::Served
        && skipped.served_to.as_deref() == Some(session.id.as_str());
    if !held {
        return Err(ServerError::Conflict(PROMPT_NOT_HELD.to_string()));
    }

    // Claim before releasing so the skipped prompt is not handed straight back
    let next = serve_prompt(&state, &session, None, "No more prompts available").await;
    state.cache.release(prompt_id, &session.id).await?;
    let next = next?;

    Ok(Json(json!({
        "prompt_id": next.prompt_id,
        "text": next.text,
        "category": next.category,
        "difficulty_level": next.difficulty_level,
        "selection_strategy": next.selection_strategy,
        "message": "Prompt skipped successfully",
    })))
}

pub async fn user_progress(
    State(state): State<SharedState>,
    Extension(session): Extension<ContributorSession>,
) -> Result<Json<UserProgress>> {
    let user = current_user(&state, &session).await?;
    Ok(Json(stats::user_progress(&state.repo, &user).await?))
}

pub async fn categories(State(state): State<SharedState>) -> Result<Json<CategoryStats>> {
    Ok(Json(stats::category_stats(&state.repo).await?))
}

pub async fn platform_stats(State(state): State<SharedState>) -> Result<Json<PlatformStats>> {
    Ok(Json(stats::platform_stats(&state.repo).await?))
}
