/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format a UTC instant the way every timestamp column stores it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current UTC time as a stored timestamp
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Serving state of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStatus {
    /// In the pool, can be handed out
    Available,
    /// Handed to a contributor
    Served,
    /// Removed from circulation
    Retired,
}

impl fmt::Display for PromptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptStatus::Available => write!(f, "available"),
            PromptStatus::Served => write!(f, "served"),
            PromptStatus::Retired => write!(f, "retired"),
        }
    }
}

impl std::str::FromStr for PromptStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(PromptStatus::Available),
            "served" => Ok(PromptStatus::Served),
            "retired" => Ok(PromptStatus::Retired),
            _ => Err(anyhow::anyhow!("Invalid prompt status: {}", s)),
        }
    }
}

/// Where a prompt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Generated by the language model
    Llm,
    /// Loaded from the CSV dataset
    Dataset,
    /// Approved community submission
    Community,
    /// Inserted by an operator
    Manual,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Llm => write!(f, "llm"),
            SourceType::Dataset => write!(f, "dataset"),
            SourceType::Community => write!(f, "community"),
            SourceType::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(SourceType::Llm),
            "dataset" => Ok(SourceType::Dataset),
            "community" => Ok(SourceType::Community),
            "manual" => Ok(SourceType::Manual),
            _ => Err(anyhow::anyhow!("Invalid source type: {}", s)),
        }
    }
}

/// Estimated difficulty of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Basic => write!(f, "basic"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Difficulty::Basic),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(anyhow::anyhow!("Invalid difficulty level: {}", s)),
        }
    }
}

/// Moderation state of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// Awaiting review
    Pending,
    /// Accepted into the corpus
    Approved,
    /// Marked for a second look
    Flagged,
    /// Legacy rejected rows, cleaned up by `cleanup-rejected`
    Rejected,
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationStatus::Pending => write!(f, "pending"),
            TranslationStatus::Approved => write!(f, "approved"),
            TranslationStatus::Flagged => write!(f, "flagged"),
            TranslationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for TranslationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TranslationStatus::Pending),
            "approved" => Ok(TranslationStatus::Approved),
            "flagged" => Ok(TranslationStatus::Flagged),
            "rejected" => Ok(TranslationStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid translation status: {}", s)),
        }
    }
}

/// Review state of a community submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    ChangesRequested,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Approved => write!(f, "approved"),
            SubmissionStatus::Rejected => write!(f, "rejected"),
            SubmissionStatus::ChangesRequested => write!(f, "changes_requested"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            "changes_requested" => Ok(SubmissionStatus::ChangesRequested),
            _ => Err(anyhow::anyhow!("Invalid submission status: {}", s)),
        }
    }
}

/// Anonymous contributor identified by a session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub session_id: String,
    pub created_at: String,
    pub last_activity: String,
    /// Translations ever created, rejections included
    pub submission_count: i64,
}

/// English sentence in the prompt pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Database ID
    pub id: i64,
    /// English text shown to contributors
    pub text: String,
    /// Category label
    pub category: String,
    /// Origin of the prompt
    pub source_type: SourceType,
    /// Estimated difficulty
    pub difficulty_level: Difficulty,
    /// Quality score (0.0 to 1.0)
    pub quality_score: f64,
    /// Serving state
    pub status: PromptStatus,
    /// Number of times the prompt was handed out
    pub usage_count: i64,
    /// Creation timestamp
    pub created_at: String,
    /// When the prompt was last handed out
    pub served_at: Option<String>,
    /// Session that last received it
    pub served_to: Option<String>,
}

/// Prompt to be inserted into the pool
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrompt {
    pub text: String,
    pub category: String,
    pub source_type: SourceType,
    pub difficulty_level: Difficulty,
    pub quality_score: f64,
}

impl NewPrompt {
    /// Create a new prompt with the default quality score
    pub fn new(
        text: impl Into<String>,
        category: impl Into<String>,
        source_type: SourceType,
        difficulty_level: Difficulty,
    ) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            source_type,
            difficulty_level,
            quality_score: 0.8,
        }
    }
}

/// Submitted Kikuyu translation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: i64,
    pub prompt_id: i64,
    pub user_id: i64,
    pub kikuyu_text: String,
    pub status: TranslationStatus,
    pub created_at: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Translation to be stored
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub prompt_id: i64,
    pub user_id: i64,
    /// Normalized Kikuyu text
    pub kikuyu_text: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Translation joined with the English prompt it answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationView {
    pub id: i64,
    pub prompt_id: i64,
    pub english: String,
    pub kikuyu: String,
    pub category: String,
    pub status: TranslationStatus,
    pub created_at: String,
}

/// Moderation audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminActionRecord {
    pub id: i64,
    pub translation_id: i64,
    pub action: String,
    pub admin_id: String,
    pub notes: Option<String>,
    pub created_at: String,
}

/// English sentence proposed by a contributor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub text: String,
    pub category: String,
    pub difficulty_level: Difficulty,
    pub submitted_by: Option<String>,
    pub submission_ip: Option<String>,
    pub status: SubmissionStatus,
    pub quality_score: f64,
    pub created_at: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_notes: Option<String>,
    /// Prompt created on approval
    pub prompt_id: Option<i64>,
}

/// Community submission to be stored
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub text: String,
    pub category: String,
    pub difficulty_level: Difficulty,
    pub submitted_by: Option<String>,
    pub submission_ip: Option<String>,
    pub quality_score: f64,
}

/// Prompt pool counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCounts {
    pub total: i64,
    pub available: i64,
    pub served: i64,
    pub retired: i64,
}

/// Refill bookkeeping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMeta {
    pub last_refill: Option<String>,
    pub total_generated: i64,
}

/// Existing row that makes a new text a duplicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateHit {
    /// Matches a community submission
    Submission(i64),
    /// Matches a prompt already in the pool
    Prompt(i64),
}

/// Translation counts by moderation state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub flagged: i64,
    pub rejected: i64,
}

/// Rows created since a cutoff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub recent_translations: i64,
    pub recent_users: i64,
    pub recent_submissions: i64,
}

/// Per-category prompt and translation totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub category: String,
    pub prompt_count: i64,
    pub translation_count: i64,
    pub avg_quality: f64,
}

/// Community submission counts by review state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub changes_requested: i64,
    /// (category, count, average quality)
    pub by_category: Vec<(String, i64, f64)>,
}
