/*!
 * Community-contributed English sentences.
 *
 * Contributors propose sentences that join the prompt pool once an admin
 * approves them. Submissions are screened by `SubmissionValidator`, scored by
 * `QualityAssessor` and tagged with a category by `auto_categorize` when the
 * contributor did not choose one.
 */

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use crate::database::models::{
    format_timestamp, Difficulty, DuplicateHit, NewPrompt, NewSubmission, SourceType,
    SubmissionRecord, SubmissionStatus,
};
use crate::database::repository::SUBMISSION_REVIEWED_MESSAGE;
use crate::database::Repository;
use crate::errors::ValidationError;

const MIN_WORDS: usize = 3;
const MAX_WORDS: usize = 30;
const MIN_CHARS: usize = 10;
const MAX_CHARS: usize = 200;

/// Share of the words one word may take before the text counts as repetitive
const MAX_WORD_SHARE: f64 = 0.4;

/// Share of common English words a sentence needs
const MIN_ENGLISH_SHARE: f64 = 0.2;

/// Words longer than this trigger a spelling warning
const LONG_WORD_CHARS: usize = 15;

static ALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[A-Za-z0-9\s.,?!'"-]+$"#).expect("valid regex"));

const INAPPROPRIATE_WORDS: &[&str] = &["damn", "hell", "stupid", "idiot", "hate"];

const COMMON_ENGLISH_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "have", "has", "had", "will", "would", "could", "should", "can", "may",
    "might", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they", "me",
    "him", "her", "us", "them",
];

/// Categories a contributor may choose
pub const SUBMISSION_CATEGORIES: &[&str] = &[
    "greetings",
    "family",
    "agriculture",
    "health",
    "education",
    "weather",
    "technology",
    "business",
    "culture",
    "general",
    "conversation",
    "news",
    "science",
    "history",
    "geography",
];

/// Keyword table used by `auto_categorize`, first match wins
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("greetings", &["hello", "hi", "good morning", "good evening", "goodbye", "bye"]),
    ("family", &["mother", "father", "child", "family", "parent", "sister", "brother", "home"]),
    ("agriculture", &["farm", "crop", "plant", "harvest", "field", "livestock", "farming", "grow"]),
    ("health", &["health", "medicine", "doctor", "hospital", "sick", "treatment"]),
    ("education", &["school", "learn", "teach", "student", "book", "study", "education"]),
    ("weather", &["weather", "rain", "sun", "hot", "cold", "wind", "season", "climate"]),
    ("technology", &["computer", "phone", "internet", "technology", "digital", "online"]),
    ("business", &["business", "work", "job", "trade", "money", "market", "sell", "buy"]),
];

/// Keywords that earn the relevance bonus in `QualityAssessor`
const RELEVANCE_KEYWORDS: &[(&str, &[&str])] = &[
    ("agriculture", &["farm", "crop", "plant", "harvest", "livestock", "field"]),
    ("health", &["health", "medicine", "doctor", "hospital", "treatment"]),
    ("education", &["school", "learn", "teach", "student", "book", "study"]),
    ("family", &["family", "mother", "father", "child", "home", "parent"]),
    ("technology", &["computer", "phone", "internet", "technology", "digital"]),
];

/// Case-insensitive whole-word matcher for a keyword list, plurals included
fn keyword_matcher(keywords: &[&str]) -> Regex {
    let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})s?\b", alternatives.join("|"))).expect("valid keyword regex")
}

static CATEGORY_MATCHERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| (*category, keyword_matcher(keywords)))
        .collect()
});

static INAPPROPRIATE_MATCHER: Lazy<Regex> = Lazy::new(|| keyword_matcher(INAPPROPRIATE_WORDS));

static RELEVANCE_MATCHERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    RELEVANCE_KEYWORDS
        .iter()
        .map(|(category, keywords)| (*category, keyword_matcher(keywords)))
        .collect()
});

fn strip_punctuation(word: &str) -> String {
    word.trim_matches(|c| matches!(c, '.' | ',' | '!' | '?'))
        .to_lowercase()
}

/// Guess a category from keywords in the text
pub fn auto_categorize(text: &str) -> &'static str {
    CATEGORY_MATCHERS
        .iter()
        .find(|(_, matcher)| matcher.is_match(text))
        .map(|(category, _)| *category)
        .unwrap_or("general")
}

/// Outcome of screening a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// First rule the text broke, if any
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    fn reject(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Rules for English sentences proposed by contributors
pub struct SubmissionValidator;

impl SubmissionValidator {
    pub fn validate(text: &str, category: Option<&str>) -> ValidationReport {
        let mut report = ValidationReport::default();
        let text = text.trim();

        if text.is_empty() {
            return report.reject("Text cannot be empty");
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < MIN_WORDS {
            return report.reject("Sentence too short. Minimum 3 words required");
        }
        if words.len() > MAX_WORDS {
            return report.reject("Sentence too long. Maximum 30 words allowed");
        }

        let chars = text.chars().count();
        if chars < MIN_CHARS {
            return report.reject("Text too short. Minimum 10 characters required");
        }
        if chars > MAX_CHARS {
            return report.reject("Text too long. Maximum 200 characters allowed");
        }

        if !ALLOWED_CHARS.is_match(text) {
            return report.reject(
                "Text contains invalid characters. Only letters, numbers, and basic punctuation allowed",
            );
        }

        if INAPPROPRIATE_MATCHER.is_match(text) {
            report
                .suggestions
                .push("Please use respectful, family-friendly language".to_string());
            return report.reject("Text contains inappropriate language");
        }

        let mut frequency: HashMap<String, usize> = HashMap::new();
        for word in &words {
            *frequency.entry(word.to_lowercase()).or_default() += 1;
        }
        let most_repeated = frequency.values().copied().max().unwrap_or(0);
        if most_repeated as f64 / words.len() as f64 > MAX_WORD_SHARE {
            report
                .suggestions
                .push("Try to use more varied vocabulary".to_string());
            return report.reject("Text has too much repetition");
        }

        if text.chars().count() > 10 && text == text.to_uppercase() {
            report
                .suggestions
                .push("Consider using normal capitalization instead of all caps".to_string());
        }
        if text.matches(['?', '!']).count() > 2 {
            report
                .suggestions
                .push("Consider simplifying punctuation for better translation".to_string());
        }

        let common = words
            .iter()
            .filter(|w| COMMON_ENGLISH_WORDS.contains(&strip_punctuation(w).as_str()))
            .count();
        if (common as f64) < words.len() as f64 * MIN_ENGLISH_SHARE {
            return report.reject("Text does not appear to be in English");
        }

        if !text.chars().next().is_some_and(char::is_uppercase) {
            report
                .warnings
                .push("Consider starting the sentence with a capital letter".to_string());
        }
        if !text.ends_with(['.', '!', '?']) {
            report
                .warnings
                .push("Consider ending the sentence with proper punctuation".to_string());
        }

        let long_words: Vec<&str> = words
            .iter()
            .copied()
            .filter(|w| w.chars().count() > LONG_WORD_CHARS)
            .collect();
        if !long_words.is_empty() {
            report.warnings.push(format!(
                "Very long words detected: {}. Please verify spelling",
                long_words.join(", ")
            ));
        }

        if let Some(category) = category {
            if !SUBMISSION_CATEGORIES.contains(&category) {
                report
                    .warnings
                    .push(format!("Category \"{}\" is not recognized", category));
            }
        }

        report
    }
}

/// Heuristic quality score for a proposed sentence
pub struct QualityAssessor;

impl QualityAssessor {
    pub fn assess(text: &str, category: &str) -> f64 {
        let text = text.trim();
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return 0.1;
        }

        let mut score = 0.7;

        if (5..=15).contains(&words.len()) {
            score += 0.1;
        } else if (3..=20).contains(&words.len()) {
            score += 0.05;
        }

        let unique: HashSet<String> = words.iter().map(|w| strip_punctuation(w)).collect();
        score += unique.len() as f64 / words.len() as f64 * 0.1;

        let capitalized = text.chars().next().is_some_and(char::is_uppercase);
        if capitalized && text.ends_with(['.', '!', '?']) {
            score += 0.05;
        }

        let relevant = RELEVANCE_MATCHERS
            .iter()
            .find(|(name, _)| *name == category)
            .is_some_and(|(_, matcher)| matcher.is_match(text));
        if relevant {
            score += 0.1;
        }

        score.clamp(0.1, 1.0)
    }
}

/// What a contributor sends
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub text: String,
    pub category: Option<String>,
    pub difficulty_level: Option<String>,
    pub submitted_by: Option<String>,
    pub client_ip: Option<String>,
}

/// Accepted submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    pub submission_id: i64,
    pub message: String,
    pub quality_score: f64,
    pub estimated_review_time: String,
    pub category: String,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Review decision taken by an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestChanges,
}

impl FromStr for ReviewAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            "request_changes" => Ok(ReviewAction::RequestChanges),
            _ => Err(ValidationError::BadRequest("Invalid action".to_string())),
        }
    }
}

/// Result of a review
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub count: i64,
    pub avg_quality: f64,
}

/// Submission totals for the admin statistics page
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStats {
    pub total_submissions: i64,
    pub pending_review: i64,
    pub approved: i64,
    pub rejected: i64,
    pub changes_requested: i64,
    /// Percentage of all submissions, one decimal
    pub approval_rate: f64,
    pub recent_submissions_week: i64,
    pub category_breakdown: BTreeMap<String, CategoryBreakdown>,
}

/// Submission intake and review
#[derive(Clone)]
pub struct CommunityService {
    repo: Repository,
    submissions_per_hour: u32,
}

impl CommunityService {
    pub fn new(repo: Repository, submissions_per_hour: u32) -> Self {
        Self {
            repo,
            submissions_per_hour,
        }
    }

    /// Screen and store a proposed sentence
    ///
    /// Fails with a `ValidationError` for rule violations, duplicates and
    /// the per-client hourly limit.
    pub async fn submit(&self, input: SubmissionInput) -> Result<SubmissionReceipt> {
        let text = input.text.trim().to_string();
        let category = input
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);

        let report = SubmissionValidator::validate(&text, category.as_deref());
        if let Some(error) = report.error {
            return Err(ValidationError::InvalidText(error).into());
        }

        if let Some(ip) = &input.client_ip {
            let since = format_timestamp(Utc::now() - ChronoDuration::hours(1));
            let recent = self.repo.count_submissions_from_ip_since(ip, &since).await?;
            if recent >= i64::from(self.submissions_per_hour) {
                return Err(ValidationError::LimitReached(format!(
                    "Submission limit reached ({} per hour). Please try again later.",
                    self.submissions_per_hour
                ))
                .into());
            }
        }

        if self.repo.find_duplicate_text(&text).await?.is_some() {
            return Err(ValidationError::Duplicate(
                "This sentence has already been submitted".to_string(),
            )
            .into());
        }

        let category = category.unwrap_or_else(|| auto_categorize(&text).to_string());
        let difficulty_level = input
            .difficulty_level
            .as_deref()
            .and_then(|d| d.parse::<Difficulty>().ok())
            .unwrap_or_default();
        let quality_score = QualityAssessor::assess(&text, &category);

        let submission_id = self
            .repo
            .insert_submission(&NewSubmission {
                text,
                category: category.clone(),
                difficulty_level,
                submitted_by: input.submitted_by,
                submission_ip: input.client_ip,
                quality_score,
            })
            .await?;

        info!(
            "Community submission {} received ({}, quality {:.2})",
            submission_id, category, quality_score
        );

        Ok(SubmissionReceipt {
            success: true,
            submission_id,
            message: "Your submission has been received and will be reviewed".to_string(),
            quality_score,
            estimated_review_time: "1-3 days".to_string(),
            category,
            warnings: report.warnings,
            suggestions: report.suggestions,
        })
    }

    /// Pending submissions, best quality first
    pub async fn pending(
        &self,
        limit: usize,
        category: Option<String>,
    ) -> Result<Vec<SubmissionRecord>> {
        self.repo.pending_submissions(limit, category).await
    }

    /// Apply an admin decision to a pending submission
    pub async fn review(
        &self,
        submission_id: i64,
        action: &str,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<ReviewOutcome> {
        let submission = self
            .repo
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| ValidationError::NotFound("Submission not found".to_string()))?;

        if submission.status != SubmissionStatus::Pending {
            return Err(ValidationError::Conflict(SUBMISSION_REVIEWED_MESSAGE.to_string()).into());
        }

        let action: ReviewAction = action.parse()?;
        let outcome = match action {
            ReviewAction::Approve => {
                let mut prompt = NewPrompt::new(
                    submission.text.clone(),
                    submission.category.clone(),
                    SourceType::Community,
                    submission.difficulty_level,
                );
                prompt.quality_score = submission.quality_score;

                let prompt_id = self
                    .repo
                    .approve_submission(submission_id, prompt, admin_id, notes)
                    .await?;
                info!("Submission {} approved as prompt {}", submission_id, prompt_id);

                ReviewOutcome {
                    success: true,
                    message: "Submission approved and added to prompt pool".to_string(),
                    prompt_id: Some(prompt_id),
                }
            }
            ReviewAction::Reject | ReviewAction::RequestChanges => {
                let (status, message) = if action == ReviewAction::Reject {
                    (SubmissionStatus::Rejected, "Submission rejected")
                } else {
                    (SubmissionStatus::ChangesRequested, "Changes requested")
                };
                let updated = self
                    .repo
                    .set_submission_review(submission_id, status, admin_id, notes)
                    .await?;
                if !updated {
                    return Err(
                        ValidationError::Conflict(SUBMISSION_REVIEWED_MESSAGE.to_string()).into(),
                    );
                }
                info!("Submission {} marked {}", submission_id, status);

                ReviewOutcome {
                    success: true,
                    message: message.to_string(),
                    prompt_id: None,
                }
            }
        };

        Ok(outcome)
    }

    /// Whether a text would be rejected as a duplicate
    pub async fn is_duplicate(&self, text: &str) -> Result<Option<DuplicateHit>> {
        self.repo.find_duplicate_text(text).await
    }

    pub async fn stats(&self) -> Result<SubmissionStats> {
        let counts = self.repo.submission_counts().await?;
        let week_ago = format_timestamp(Utc::now() - ChronoDuration::days(7));
        let recent = self.repo.recent_activity(&week_ago).await?;

        let approval_rate = if counts.total > 0 {
            (counts.approved as f64 / counts.total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        let category_breakdown = counts
            .by_category
            .into_iter()
            .map(|(category, count, avg)| {
                (
                    category,
                    CategoryBreakdown {
                        count,
                        avg_quality: (avg * 100.0).round() / 100.0,
                    },
                )
            })
            .collect();

        Ok(SubmissionStats {
            total_submissions: counts.total,
            pending_review: counts.pending,
            approved: counts.approved,
            rejected: counts.rejected,
            changes_requested: counts.changes_requested,
            approval_rate,
            recent_submissions_week: recent.recent_submissions,
            category_breakdown,
        })
    }
}
