/*!
 * HTTP request handlers.
 *
 * - `public`: contributor pages (`/`, `/translate`, `/thank-you`, ...)
 * - `api`: JSON API under `/api/`
 * - `admin`: admin panel under `/admin/`
 */

pub mod admin;
pub mod api;
pub mod public;

use serde::Serialize;

use crate::database::models::{Difficulty, PromptRecord, UserRecord};
use crate::rate_limit::check_daily_submissions;
use crate::selection::{self, SelectionStrategy};

use super::error::{Result, ServerError};
use super::session::ContributorSession;
use super::state::AppState;

/// Prompt as shown to a contributor
#[derive(Debug, Clone, Serialize)]
pub struct PromptPayload {
    pub prompt_id: i64,
    pub text: String,
    pub category: String,
    pub difficulty_level: Difficulty,
    pub selection_strategy: SelectionStrategy,
}

impl PromptPayload {
    pub fn new(prompt: PromptRecord, selection_strategy: SelectionStrategy) -> Self {
        Self {
            prompt_id: prompt.id,
            text: prompt.text,
            category: prompt.category,
            difficulty_level: prompt.difficulty_level,
            selection_strategy,
        }
    }
}

/// User behind the request's session, created on first sight
pub(crate) async fn current_user(
    state: &AppState,
    session: &ContributorSession,
) -> Result<UserRecord> {
    Ok(state.repo.get_or_create_user(&session.id).await?)
}

/// Hand out the best prompt for the user after checking their daily limit
pub(crate) async fn serve_prompt(
    state: &AppState,
    session: &ContributorSession,
    category: Option<String>,
    empty_message: &str,
) -> Result<PromptPayload> {
    let user = current_user(state, session).await?;
    check_daily_submissions(&state.repo, user.id, state.config.limits.daily_submission_limit)
        .await?;

    let plan = selection::plan_for(&state.repo, &user, category.as_deref()).await?;
    let strategy = plan.strategy;
    state
        .cache
        .serve(&session.id, plan)
        .await?
        .map(|prompt| PromptPayload::new(prompt, strategy))
        .ok_or_else(|| ServerError::NotFound(empty_message.to_string()))
}
