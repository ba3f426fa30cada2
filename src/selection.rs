/*!
 * Prompt selection.
 *
 * Decides which available prompt a contributor sees next. Categories whose
 * translations lag behind their prompts are served first, newcomers start
 * with basic sentences, and nobody is handed a prompt they already
 * translated. The chosen strategy travels with the prompt to the client.
 */

use anyhow::Result;
use serde::Serialize;
use std::fmt;

use crate::database::models::{CategoryRow, Difficulty, PromptRecord, UserRecord};
use crate::database::Repository;
use crate::prompts::PROMPT_CATEGORIES;
use crate::stats::percentage;

/// Categories below this coverage are filled before anything else
pub const CRITICAL_COVERAGE: f64 = 25.0;

/// Categories below this coverage are favoured by balanced selection
pub const UNDERREPRESENTED_COVERAGE: f64 = 50.0;

/// Contributors with fewer translations than this are onboarding
pub const ONBOARDING_TRANSLATIONS: i64 = 5;

/// Gentle categories used while onboarding
pub const ONBOARDING_CATEGORIES: &[&str] = &["greetings", "family", "general"];

/// Quality at which a prompt counts as a strong candidate for a gap
const HIGH_QUALITY: f64 = 0.8;

/// How many underrepresented categories balanced selection favours
const BALANCED_FOCUS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    UserPreference,
    CriticalGapFilling,
    Onboarding,
    Balanced,
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionStrategy::UserPreference => write!(f, "user_preference"),
            SelectionStrategy::CriticalGapFilling => write!(f, "critical_gap_filling"),
            SelectionStrategy::Onboarding => write!(f, "onboarding"),
            SelectionStrategy::Balanced => write!(f, "balanced"),
        }
    }
}

/// Translation coverage of one category, in percent
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCoverage {
    pub category: String,
    pub coverage: f64,
}

/// Coverage per category, lowest first
pub fn coverage_from_rows(rows: &[CategoryRow]) -> Vec<CategoryCoverage> {
    let mut coverage: Vec<CategoryCoverage> = rows
        .iter()
        .map(|row| CategoryCoverage {
            category: row.category.clone(),
            coverage: percentage(row.translation_count, row.prompt_count),
        })
        .collect();
    coverage.sort_by(|a, b| {
        a.coverage
            .total_cmp(&b.coverage)
            .then_with(|| a.category.cmp(&b.category))
    });
    coverage
}

/// How the next prompt should be chosen for one contributor
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    pub strategy: SelectionStrategy,
    /// Categories to serve first, most wanted first
    pub priority_categories: Vec<String>,
    /// Contributor whose translated prompts are excluded
    pub exclude_translated_by: Option<i64>,
}

impl SelectionPlan {
    /// Oldest-first plan that only honours an optional category preference
    pub fn preferring(category: Option<String>) -> Self {
        match category {
            Some(category) => Self {
                strategy: SelectionStrategy::UserPreference,
                priority_categories: vec![category],
                exclude_translated_by: None,
            },
            None => Self {
                strategy: SelectionStrategy::Balanced,
                priority_categories: Vec::new(),
                exclude_translated_by: None,
            },
        }
    }

    fn category_rank(&self, category: &str) -> usize {
        self.priority_categories
            .iter()
            .position(|c| c == category)
            .unwrap_or(self.priority_categories.len())
    }

    fn difficulty_rank(&self, difficulty: Difficulty) -> u8 {
        match self.strategy {
            SelectionStrategy::Onboarding | SelectionStrategy::UserPreference => match difficulty {
                Difficulty::Basic => 0,
                Difficulty::Intermediate => 1,
                Difficulty::Advanced => 2,
            },
            _ => 0,
        }
    }

    fn quality_rank(&self, quality: f64) -> u8 {
        match self.strategy {
            SelectionStrategy::CriticalGapFilling if quality < HIGH_QUALITY => 1,
            _ => 0,
        }
    }

    /// Best candidate under this plan
    ///
    /// Ranks by priority category, then difficulty and quality where the
    /// strategy cares, then fewest previous servings, then age.
    pub fn pick<'a>(&self, candidates: &'a [PromptRecord]) -> Option<&'a PromptRecord> {
        candidates.iter().min_by_key(|p| {
            (
                self.category_rank(&p.category),
                self.difficulty_rank(p.difficulty_level),
                self.quality_rank(p.quality_score),
                p.usage_count,
                p.created_at.clone(),
                p.id,
            )
        })
    }
}

/// Choose a strategy from coverage, the user's history and their preference
pub fn plan_selection(
    coverage: &[CategoryCoverage],
    completed: i64,
    preferred_category: Option<&str>,
    user_id: Option<i64>,
) -> SelectionPlan {
    let below = |limit: f64| -> Vec<String> {
        coverage
            .iter()
            .filter(|c| c.coverage < limit)
            .map(|c| c.category.clone())
            .collect()
    };

    let (strategy, priority_categories) = if let Some(category) = preferred_category {
        (SelectionStrategy::UserPreference, vec![category.to_string()])
    } else if completed < ONBOARDING_TRANSLATIONS {
        (
            SelectionStrategy::Onboarding,
            ONBOARDING_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        )
    } else {
        let critical = below(CRITICAL_COVERAGE);
        if critical.is_empty() {
            let mut underrepresented = below(UNDERREPRESENTED_COVERAGE);
            underrepresented.truncate(BALANCED_FOCUS);
            (SelectionStrategy::Balanced, underrepresented)
        } else {
            (SelectionStrategy::CriticalGapFilling, critical)
        }
    };

    SelectionPlan {
        strategy,
        priority_categories,
        exclude_translated_by: user_id,
    }
}

/// Build the plan for a contributor from the current corpus state
pub async fn plan_for(
    repo: &Repository,
    user: &UserRecord,
    preferred_category: Option<&str>,
) -> Result<SelectionPlan> {
    let coverage = coverage_from_rows(&repo.category_rows().await?);
    let completed = repo.count_user_translations(user.id, None).await?;
    Ok(plan_selection(
        &coverage,
        completed,
        preferred_category,
        Some(user.id),
    ))
}

/// Generation categories ordered so the least covered are asked for first
pub fn refill_categories(rows: &[CategoryRow]) -> Vec<&'static str> {
    let coverage = coverage_from_rows(rows);
    let mut categories: Vec<&'static str> = PROMPT_CATEGORIES.to_vec();
    // Categories with no prompts at all sort first
    categories.sort_by_key(|name| {
        let percent = coverage
            .iter()
            .find(|c| c.category == *name)
            .map_or(-1.0, |c| c.coverage);
        ordered(percent)
    });
    categories
}

/// Sortable key for a percentage with one decimal
fn ordered(percent: f64) -> i64 {
    (percent * 10.0).round() as i64
}
