/*!
 * Read-only statistics over prompts, translations and contributors.
 */

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::database::models::{
    format_timestamp, PromptCounts, RecentActivity, TranslationCounts, TranslationStatus,
    UserRecord,
};
use crate::database::Repository;

/// Categories below this coverage are marked as needing attention
const ATTENTION_COVERAGE: f64 = 50.0;

/// Length of the "recent" window, in days
pub const RECENT_DAYS: i64 = 7;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Percentage of `part` in `whole`, one decimal, 0 when `whole` is 0
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, 1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub prompts: PromptCounts,
    pub translations: TranslationCounts,
    pub users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStat {
    pub name: String,
    pub prompt_count: i64,
    pub translation_count: i64,
    pub coverage_percentage: f64,
    pub average_quality: f64,
    pub needs_attention: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    /// Least covered first
    pub categories: Vec<CategoryStat>,
    pub total_categories: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProgress {
    pub total_translations: i64,
    pub approved_translations: i64,
    pub approval_rate: f64,
    pub categories: BTreeMap<String, i64>,
    pub member_since: String,
    pub last_activity: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStats {
    pub total_translations: i64,
    pub approved_translations: i64,
    pub active_users: i64,
    pub recent_activity_week: i64,
    pub community_contributions: i64,
    pub platform_quality: f64,
}

/// Totals by status plus user count
pub async fn overview(repo: &Repository) -> Result<Overview> {
    Ok(Overview {
        prompts: repo.prompt_counts().await?,
        translations: repo.translation_counts().await?,
        users: repo.count_users().await?,
    })
}

/// Rows created during the last week
pub async fn recent_activity(repo: &Repository) -> Result<RecentActivity> {
    let since = format_timestamp(Utc::now() - ChronoDuration::days(RECENT_DAYS));
    repo.recent_activity(&since).await
}

/// Per-category coverage, least covered first
pub async fn category_stats(repo: &Repository) -> Result<CategoryStats> {
    let mut categories: Vec<CategoryStat> = repo
        .category_rows()
        .await?
        .into_iter()
        .map(|row| {
            let coverage = percentage(row.translation_count, row.prompt_count);
            CategoryStat {
                name: row.category,
                prompt_count: row.prompt_count,
                translation_count: row.translation_count,
                coverage_percentage: coverage,
                average_quality: round_to(row.avg_quality, 2),
                needs_attention: coverage < ATTENTION_COVERAGE,
            }
        })
        .collect();

    categories.sort_by(|a, b| {
        a.coverage_percentage
            .total_cmp(&b.coverage_percentage)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(CategoryStats {
        total_categories: categories.len(),
        categories,
    })
}

/// Contribution summary for one user
pub async fn user_progress(repo: &Repository, user: &UserRecord) -> Result<UserProgress> {
    let total = repo.count_user_translations(user.id, None).await?;
    let approved = repo
        .count_user_translations(user.id, Some(TranslationStatus::Approved))
        .await?;

    Ok(UserProgress {
        total_translations: total,
        approved_translations: approved,
        approval_rate: percentage(approved, total),
        categories: repo.user_category_counts(user.id).await?.into_iter().collect(),
        member_since: user.created_at.clone(),
        last_activity: user.last_activity.clone(),
    })
}

/// Public platform totals
pub async fn platform_stats(repo: &Repository) -> Result<PlatformStats> {
    let translations = repo.translation_counts().await?;
    let recent = recent_activity(repo).await?;
    let submissions = repo.submission_counts().await?;

    Ok(PlatformStats {
        total_translations: translations.total,
        approved_translations: translations.approved,
        active_users: repo.count_users().await?,
        recent_activity_week: recent.recent_translations,
        community_contributions: submissions.approved,
        platform_quality: round_to(repo.average_prompt_quality().await?, 2),
    })
}
