/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::path::Path;

use super::connection::DatabaseConnection;
use super::models::{
    now_timestamp, AdminActionRecord, CacheMeta, CategoryRow, Difficulty, DuplicateHit,
    NewPrompt, NewSubmission, NewTranslation, PromptCounts, PromptRecord, PromptStatus,
    RecentActivity, SourceType, SubmissionCounts, SubmissionRecord, SubmissionStatus,
    TranslationCounts, TranslationRecord, TranslationStatus, TranslationView, UserRecord,
};
use crate::errors::ValidationError;
use crate::selection::SelectionPlan;
use crate::validation::duplicate_key;

const PROMPT_COLUMNS: &str = "id, text, category, source_type, difficulty_level, quality_score, \
     status, usage_count, created_at, served_at, served_to";

const TRANSLATION_COLUMNS: &str =
    "id, prompt_id, user_id, kikuyu_text, status, created_at, ip_address, user_agent";

const VIEW_SELECT: &str = "SELECT t.id, t.prompt_id, p.text, t.kikuyu_text, p.category, t.status, t.created_at \
     FROM translations t JOIN prompts p ON p.id = t.prompt_id";

const SUBMISSION_COLUMNS: &str = "id, text, category, difficulty_level, submitted_by, submission_ip, \
     status, quality_score, created_at, reviewed_by, reviewed_at, review_notes, prompt_id";

/// Message shown when the same translation was already given for a prompt
pub const DUPLICATE_TRANSLATION_MESSAGE: &str =
    "This translation has already been submitted for this prompt.";

/// Message shown when a translation targets a prompt served to someone else
pub const PROMPT_NOT_HELD_MESSAGE: &str = "This prompt was not served to you. Please request a new one.";

/// Message shown when a submission already has a decision
pub const SUBMISSION_REVIEWED_MESSAGE: &str = "Submission already reviewed";

/// Hash used to deduplicate prompt texts (case and surrounding whitespace ignored)
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn map_user(row: &Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        created_at: row.get(2)?,
        last_activity: row.get(3)?,
        submission_count: row.get(4)?,
    })
}

fn map_prompt(row: &Row) -> rusqlite::Result<PromptRecord> {
    Ok(PromptRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        category: row.get(2)?,
        source_type: row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(SourceType::Manual),
        difficulty_level: row
            .get::<_, String>(4)?
            .parse()
            .unwrap_or(Difficulty::Basic),
        quality_score: row.get(5)?,
        status: row
            .get::<_, String>(6)?
            .parse()
            .unwrap_or(PromptStatus::Retired),
        usage_count: row.get(7)?,
        created_at: row.get(8)?,
        served_at: row.get(9)?,
        served_to: row.get(10)?,
    })
}

fn map_translation(row: &Row) -> rusqlite::Result<TranslationRecord> {
    Ok(TranslationRecord {
        id: row.get(0)?,
        prompt_id: row.get(1)?,
        user_id: row.get(2)?,
        kikuyu_text: row.get(3)?,
        status: row
            .get::<_, String>(4)?
            .parse()
            .unwrap_or(TranslationStatus::Pending),
        created_at: row.get(5)?,
        ip_address: row.get(6)?,
        user_agent: row.get(7)?,
    })
}

fn map_view(row: &Row) -> rusqlite::Result<TranslationView> {
    Ok(TranslationView {
        id: row.get(0)?,
        prompt_id: row.get(1)?,
        english: row.get(2)?,
        kikuyu: row.get(3)?,
        category: row.get(4)?,
        status: row
            .get::<_, String>(5)?
            .parse()
            .unwrap_or(TranslationStatus::Pending),
        created_at: row.get(6)?,
    })
}

fn map_submission(row: &Row) -> rusqlite::Result<SubmissionRecord> {
    Ok(SubmissionRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        category: row.get(2)?,
        difficulty_level: row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(Difficulty::Basic),
        submitted_by: row.get(4)?,
        submission_ip: row.get(5)?,
        status: row
            .get::<_, String>(6)?
            .parse()
            .unwrap_or(SubmissionStatus::Pending),
        quality_score: row.get(7)?,
        created_at: row.get(8)?,
        reviewed_by: row.get(9)?,
        reviewed_at: row.get(10)?,
        review_notes: row.get(11)?,
        prompt_id: row.get(12)?,
    })
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open (or create) the database file at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Round-trip a trivial query, used by health checks
    pub async fn ping(&self) -> Result<()> {
        self.db
            .execute_async(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Find the user for a session, creating it on first sight, and stamp activity
    pub async fn get_or_create_user(&self, session_id: &str) -> Result<UserRecord> {
        let session_id = session_id.to_string();
        let now = now_timestamp();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users (session_id, created_at, last_activity, submission_count)
                    VALUES (?1, ?2, ?2, 0)
                    ON CONFLICT(session_id) DO UPDATE SET last_activity = excluded.last_activity
                    "#,
                    params![session_id, now],
                )?;

                let user = conn.query_row(
                    "SELECT id, session_id, created_at, last_activity, submission_count FROM users WHERE session_id = ?1",
                    [&session_id],
                    map_user,
                )?;
                Ok(user)
            })
            .await
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
        self.db
            .execute_async(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, session_id, created_at, last_activity, submission_count FROM users WHERE id = ?1",
                        [user_id],
                        map_user,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
    }

    /// Count users
    pub async fn count_users(&self) -> Result<i64> {
        self.db
            .execute_async(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
            })
            .await
    }

    /// Count a user's translations, optionally restricted to one status
    pub async fn count_user_translations(
        &self,
        user_id: i64,
        status: Option<TranslationStatus>,
    ) -> Result<i64> {
        let status = status.map(|s| s.to_string());

        self.db
            .execute_async(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM translations WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)",
                    params![user_id, status],
                    |row| row.get(0),
                )?)
            })
            .await
    }

    /// Count a user's translations created at or after `since`
    pub async fn count_user_translations_since(&self, user_id: i64, since: &str) -> Result<i64> {
        let since = since.to_string();

        self.db
            .execute_async(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM translations WHERE user_id = ?1 AND created_at >= ?2",
                    params![user_id, since],
                    |row| row.get(0),
                )?)
            })
            .await
    }

    /// Translation counts per prompt category for one user
    pub async fn user_category_counts(&self, user_id: i64) -> Result<Vec<(String, i64)>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT p.category, COUNT(t.id)
                    FROM translations t JOIN prompts p ON p.id = t.prompt_id
                    WHERE t.user_id = ?1
                    GROUP BY p.category
                    ORDER BY p.category
                    "#,
                )?;
                let rows = stmt
                    .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    // =========================================================================
    // Prompt Operations
    // =========================================================================

    /// Insert a prompt, returning its ID or `None` when the text already exists
    pub async fn insert_prompt(&self, prompt: &NewPrompt) -> Result<Option<i64>> {
        let prompt = prompt.clone();

        self.db
            .execute_async(move |conn| Self::insert_prompt_sync(conn, &prompt))
            .await
    }

    fn insert_prompt_sync(conn: &Connection, prompt: &NewPrompt) -> Result<Option<i64>> {
        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO prompts (
                text, text_hash, category, source_type, difficulty_level,
                quality_score, status, usage_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'available', 0, ?7)
            "#,
            params![
                prompt.text.trim(),
                text_hash(&prompt.text),
                prompt.category,
                prompt.source_type.to_string(),
                prompt.difficulty_level.to_string(),
                prompt.quality_score,
                now_timestamp(),
            ],
        )?;

        Ok((changed == 1).then(|| conn.last_insert_rowid()))
    }

    /// Insert many prompts in one transaction, returning how many were new
    pub async fn insert_prompts(&self, prompts: Vec<NewPrompt>) -> Result<usize> {
        if prompts.is_empty() {
            return Ok(0);
        }

        self.db
            .transaction_async(move |tx| {
                let mut added = 0;
                for prompt in &prompts {
                    if Self::insert_prompt_sync(tx, prompt)?.is_some() {
                        added += 1;
                    }
                }
                debug!("Inserted {} of {} prompts", added, prompts.len());
                Ok(added)
            })
            .await
    }

    /// Get a prompt by ID
    pub async fn get_prompt(&self, prompt_id: i64) -> Result<Option<PromptRecord>> {
        self.db
            .execute_async(move |conn| Self::get_prompt_sync(conn, prompt_id))
            .await
    }

    fn get_prompt_sync(conn: &Connection, prompt_id: i64) -> Result<Option<PromptRecord>> {
        let prompt = conn
            .query_row(
                &format!("SELECT {} FROM prompts WHERE id = ?1", PROMPT_COLUMNS),
                [prompt_id],
                map_prompt,
            )
            .optional()?;
        Ok(prompt)
    }

    /// Keep only the texts that are not already prompts
    pub async fn filter_unknown_texts(&self, texts: Vec<String>) -> Result<Vec<String>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare("SELECT 1 FROM prompts WHERE text_hash = ?1")?;
                let mut unknown = Vec::new();
                for text in texts {
                    if !stmt.exists([text_hash(&text)])? {
                        unknown.push(text);
                    }
                }
                Ok(unknown)
            })
            .await
    }

    /// Hand out the oldest available prompt, preferred category first
    pub async fn claim_next_prompt(
        &self,
        session_id: &str,
        preferred_category: Option<String>,
    ) -> Result<Option<PromptRecord>> {
        self.claim_prompt(session_id, SelectionPlan::preferring(preferred_category))
            .await
    }

    /// Atomically hand out the available prompt ranked best by `plan`
    ///
    /// Prompts the plan's contributor already translated are never offered.
    pub async fn claim_prompt(
        &self,
        session_id: &str,
        plan: SelectionPlan,
    ) -> Result<Option<PromptRecord>> {
        let session_id = session_id.to_string();
        let now = now_timestamp();

        self.db
            .transaction_async(move |tx| {
                let mut stmt = tx.prepare(&format!(
                    r#"
                    SELECT {} FROM prompts p
                    WHERE status = 'available'
                      AND (?1 IS NULL OR NOT EXISTS (
                          SELECT 1 FROM translations t WHERE t.prompt_id = p.id AND t.user_id = ?1))
                    "#,
                    PROMPT_COLUMNS
                ))?;
                let candidates = stmt
                    .query_map([plan.exclude_translated_by], map_prompt)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let Some(prompt_id) = plan.pick(&candidates).map(|p| p.id) else {
                    return Ok(None);
                };

                tx.execute(
                    r#"
                    UPDATE prompts
                    SET status = 'served', usage_count = usage_count + 1, served_at = ?2, served_to = ?3
                    WHERE id = ?1 AND status = 'available'
                    "#,
                    params![prompt_id, now, session_id],
                )?;

                Self::get_prompt_sync(tx, prompt_id)
            })
            .await
    }

    /// Return a prompt to the pool when `session_id` holds it untranslated
    pub async fn release_prompt(&self, prompt_id: i64, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE prompts SET status = 'available', served_at = NULL, served_to = NULL
                    WHERE id = ?1 AND status = 'served' AND served_to = ?2
                      AND NOT EXISTS (SELECT 1 FROM translations WHERE prompt_id = ?1)
                    "#,
                    params![prompt_id, session_id],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    /// Take an available prompt out of the pool without a session
    pub async fn mark_prompt_served(&self, prompt_id: i64) -> Result<bool> {
        let now = now_timestamp();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE prompts SET status = 'served', usage_count = usage_count + 1, served_at = ?2 WHERE id = ?1 AND status = 'available'",
                    params![prompt_id, now],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    /// Return every served prompt to the pool and zero usage counts
    pub async fn reset_served_prompts(&self) -> Result<usize> {
        self.db
            .transaction_async(|tx| {
                let released = tx.execute(
                    "UPDATE prompts SET status = 'available', served_at = NULL, served_to = NULL WHERE status = 'served'",
                    [],
                )?;
                tx.execute(
                    "UPDATE prompts SET usage_count = 0 WHERE status != 'retired'",
                    [],
                )?;
                Ok(released)
            })
            .await
    }

    /// Retire available prompts created before `cutoff`
    pub async fn retire_prompts_before(&self, cutoff: &str) -> Result<usize> {
        let cutoff = cutoff.to_string();

        self.db
            .execute_async(move |conn| {
                Ok(conn.execute(
                    "UPDATE prompts SET status = 'retired' WHERE status = 'available' AND created_at < ?1",
                    [cutoff],
                )?)
            })
            .await
    }

    /// Count prompts by status
    pub async fn prompt_counts(&self) -> Result<PromptCounts> {
        self.db
            .execute_async(|conn| {
                let mut counts = PromptCounts::default();
                let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM prompts GROUP BY status")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;

                for row in rows {
                    let (status, count) = row?;
                    counts.total += count;
                    match status.parse::<PromptStatus>() {
                        Ok(PromptStatus::Available) => counts.available = count,
                        Ok(PromptStatus::Served) => counts.served = count,
                        Ok(PromptStatus::Retired) => counts.retired = count,
                        Err(_) => {}
                    }
                }
                Ok(counts)
            })
            .await
    }

    /// Average quality score over all prompts
    pub async fn average_prompt_quality(&self) -> Result<f64> {
        self.db
            .execute_async(|conn| {
                let avg: Option<f64> =
                    conn.query_row("SELECT AVG(quality_score) FROM prompts", [], |row| row.get(0))?;
                Ok(avg.unwrap_or(0.0))
            })
            .await
    }

    /// Per-category prompt and translation totals
    pub async fn category_rows(&self) -> Result<Vec<CategoryRow>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT p.category,
                           COUNT(*),
                           COALESCE(SUM((SELECT COUNT(*) FROM translations t WHERE t.prompt_id = p.id)), 0),
                           COALESCE(AVG(p.quality_score), 0.0)
                    FROM prompts p
                    GROUP BY p.category
                    "#,
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(CategoryRow {
                            category: row.get(0)?,
                            prompt_count: row.get(1)?,
                            translation_count: row.get(2)?,
                            avg_quality: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    // =========================================================================
    // Translation Operations
    // =========================================================================

    /// Store a translation and bump the author's submission count
    ///
    /// Fails with a `ValidationError` when the prompt is unknown, is not held
    /// by the author's session, or the same text (case and whitespace
    /// insensitive) already exists for the prompt.
    pub async fn create_translation(&self, new: NewTranslation) -> Result<TranslationRecord> {
        let now = now_timestamp();

        self.db
            .transaction_async(move |tx| {
                let holder: Option<(String, Option<String>)> = tx
                    .query_row(
                        "SELECT status, served_to FROM prompts WHERE id = ?1",
                        [new.prompt_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let Some((status, served_to)) = holder else {
                    return Err(ValidationError::NotFound("Prompt not found".to_string()).into());
                };
                let session_id: Option<String> = tx
                    .query_row(
                        "SELECT session_id FROM users WHERE id = ?1",
                        [new.user_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if status != "served" || served_to.is_none() || served_to != session_id {
                    return Err(ValidationError::Conflict(PROMPT_NOT_HELD_MESSAGE.to_string()).into());
                }

                let key = duplicate_key(&new.kikuyu_text);
                let mut stmt = tx.prepare("SELECT kikuyu_text FROM translations WHERE prompt_id = ?1")?;
                let existing = stmt
                    .query_map([new.prompt_id], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                if existing.iter().any(|text| duplicate_key(text) == key) {
                    return Err(
                        ValidationError::Duplicate(DUPLICATE_TRANSLATION_MESSAGE.to_string()).into(),
                    );
                }

                tx.execute(
                    r#"
                    INSERT INTO translations (prompt_id, user_id, kikuyu_text, status, created_at, ip_address, user_agent)
                    VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)
                    "#,
                    params![
                        new.prompt_id,
                        new.user_id,
                        new.kikuyu_text,
                        now,
                        new.ip_address,
                        new.user_agent,
                    ],
                )?;
                let id = tx.last_insert_rowid();

                tx.execute(
                    "UPDATE users SET submission_count = submission_count + 1, last_activity = ?2 WHERE id = ?1",
                    params![new.user_id, now],
                )?;

                Ok(TranslationRecord {
                    id,
                    prompt_id: new.prompt_id,
                    user_id: new.user_id,
                    kikuyu_text: new.kikuyu_text,
                    status: TranslationStatus::Pending,
                    created_at: now,
                    ip_address: new.ip_address,
                    user_agent: new.user_agent,
                })
            })
            .await
    }

    /// Get a translation by ID
    pub async fn get_translation(&self, translation_id: i64) -> Result<Option<TranslationRecord>> {
        self.db
            .execute_async(move |conn| {
                let translation = conn
                    .query_row(
                        &format!("SELECT {} FROM translations WHERE id = ?1", TRANSLATION_COLUMNS),
                        [translation_id],
                        map_translation,
                    )
                    .optional()?;
                Ok(translation)
            })
            .await
    }

    /// Newest translations joined with their prompts
    pub async fn list_translations(
        &self,
        status: Option<TranslationStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TranslationView>> {
        let status = status.map(|s| s.to_string());

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE (?1 IS NULL OR t.status = ?1) ORDER BY t.created_at DESC, t.id DESC LIMIT ?2 OFFSET ?3",
                    VIEW_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![status, limit as i64, offset as i64], map_view)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    /// Count translations, optionally restricted to one status
    pub async fn count_translations(&self, status: Option<TranslationStatus>) -> Result<i64> {
        let status = status.map(|s| s.to_string());

        self.db
            .execute_async(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM translations WHERE (?1 IS NULL OR status = ?1)",
                    params![status],
                    |row| row.get(0),
                )?)
            })
            .await
    }

    /// Count translations by status
    pub async fn translation_counts(&self) -> Result<TranslationCounts> {
        self.db
            .execute_async(|conn| {
                let mut counts = TranslationCounts::default();
                let mut stmt =
                    conn.prepare("SELECT status, COUNT(*) FROM translations GROUP BY status")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;

                for row in rows {
                    let (status, count) = row?;
                    counts.total += count;
                    match status.parse::<TranslationStatus>() {
                        Ok(TranslationStatus::Pending) => counts.pending = count,
                        Ok(TranslationStatus::Approved) => counts.approved = count,
                        Ok(TranslationStatus::Flagged) => counts.flagged = count,
                        Ok(TranslationStatus::Rejected) => counts.rejected = count,
                        Err(_) => {}
                    }
                }
                Ok(counts)
            })
            .await
    }

    /// Set a translation's status and record the admin action in one transaction
    ///
    /// Returns `false` when the translation does not exist.
    pub async fn update_translation_status_logged(
        &self,
        translation_id: i64,
        status: TranslationStatus,
        action: &str,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<bool> {
        let action = action.to_string();
        let admin_id = admin_id.to_string();
        let now = now_timestamp();

        self.db
            .transaction_async(move |tx| {
                let changed = tx.execute(
                    "UPDATE translations SET status = ?2 WHERE id = ?1",
                    params![translation_id, status.to_string()],
                )?;
                if changed == 0 {
                    return Ok(false);
                }

                Self::record_admin_action_sync(tx, translation_id, &action, &admin_id, notes, &now)?;
                Ok(true)
            })
            .await
    }

    /// Delete a translation, release its prompt and record the admin action
    ///
    /// Returns the prompt ID, or `None` when the translation does not exist.
    pub async fn delete_translation_logged(
        &self,
        translation_id: i64,
        action: &str,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<Option<i64>> {
        let action = action.to_string();
        let admin_id = admin_id.to_string();
        let now = now_timestamp();

        self.db
            .transaction_async(move |tx| {
                let prompt_id: Option<i64> = tx
                    .query_row(
                        "SELECT prompt_id FROM translations WHERE id = ?1",
                        [translation_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                let Some(prompt_id) = prompt_id else {
                    return Ok(None);
                };

                tx.execute("DELETE FROM translations WHERE id = ?1", [translation_id])?;
                tx.execute(
                    "UPDATE prompts SET status = 'available', served_at = NULL, served_to = NULL WHERE id = ?1 AND status = 'served'",
                    [prompt_id],
                )?;

                Self::record_admin_action_sync(tx, translation_id, &action, &admin_id, notes, &now)?;
                Ok(Some(prompt_id))
            })
            .await
    }

    fn record_admin_action_sync(
        conn: &Connection,
        translation_id: i64,
        action: &str,
        admin_id: &str,
        notes: Option<String>,
        now: &str,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO admin_actions (translation_id, action, admin_id, notes, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![translation_id, action, admin_id, notes, now],
        )?;
        Ok(())
    }

    /// Audit entries for a translation, oldest first
    pub async fn admin_actions_for(&self, translation_id: i64) -> Result<Vec<AdminActionRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, translation_id, action, admin_id, notes, created_at FROM admin_actions WHERE translation_id = ?1 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map([translation_id], |row| {
                        Ok(AdminActionRecord {
                            id: row.get(0)?,
                            translation_id: row.get(1)?,
                            action: row.get(2)?,
                            admin_id: row.get(3)?,
                            notes: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    /// IDs of translations still stored with status `rejected`
    pub async fn rejected_translation_ids(&self) -> Result<Vec<i64>> {
        self.db
            .execute_async(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id FROM translations WHERE status = 'rejected' ORDER BY id")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?;
                Ok(ids)
            })
            .await
    }

    // =========================================================================
    // Community Submission Operations
    // =========================================================================

    /// Store a community submission
    pub async fn insert_submission(&self, submission: &NewSubmission) -> Result<i64> {
        let submission = submission.clone();
        let now = now_timestamp();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO community_submissions (
                        text, category, difficulty_level, submitted_by, submission_ip,
                        status, quality_score, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)
                    "#,
                    params![
                        submission.text,
                        submission.category,
                        submission.difficulty_level.to_string(),
                        submission.submitted_by,
                        submission.submission_ip,
                        submission.quality_score,
                        now,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Look for an existing submission or prompt with the same text
    pub async fn find_duplicate_text(&self, text: &str) -> Result<Option<DuplicateHit>> {
        let normalized = text.trim().to_lowercase();
        let hash = text_hash(text);

        self.db
            .execute_async(move |conn| {
                let submission: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM community_submissions WHERE lower(trim(text)) = ?1 LIMIT 1",
                        [&normalized],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(id) = submission {
                    return Ok(Some(DuplicateHit::Submission(id)));
                }

                let prompt: Option<i64> = conn
                    .query_row("SELECT id FROM prompts WHERE text_hash = ?1", [&hash], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(prompt.map(DuplicateHit::Prompt))
            })
            .await
    }

    /// Count submissions from one client address since a cutoff
    pub async fn count_submissions_from_ip_since(&self, ip: &str, since: &str) -> Result<i64> {
        let ip = ip.to_string();
        let since = since.to_string();

        self.db
            .execute_async(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM community_submissions WHERE submission_ip = ?1 AND created_at >= ?2",
                    params![ip, since],
                    |row| row.get(0),
                )?)
            })
            .await
    }

    /// Pending submissions, best quality first
    pub async fn pending_submissions(
        &self,
        limit: usize,
        category: Option<String>,
    ) -> Result<Vec<SubmissionRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    r#"
                    SELECT {} FROM community_submissions
                    WHERE status = 'pending' AND (?1 IS NULL OR category = ?1)
                    ORDER BY quality_score DESC, created_at ASC, id ASC
                    LIMIT ?2
                    "#,
                    SUBMISSION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![category, limit as i64], map_submission)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    /// Get a submission by ID
    pub async fn get_submission(&self, submission_id: i64) -> Result<Option<SubmissionRecord>> {
        self.db
            .execute_async(move |conn| {
                let submission = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM community_submissions WHERE id = ?1",
                            SUBMISSION_COLUMNS
                        ),
                        [submission_id],
                        map_submission,
                    )
                    .optional()?;
                Ok(submission)
            })
            .await
    }

    /// Approve a pending submission and add it to the prompt pool
    ///
    /// Returns the prompt ID, reusing an existing prompt with the same text.
    pub async fn approve_submission(
        &self,
        submission_id: i64,
        prompt: NewPrompt,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<i64> {
        let admin_id = admin_id.to_string();
        let now = now_timestamp();

        self.db
            .transaction_async(move |tx| {
                let claimed = tx.execute(
                    r#"
                    UPDATE community_submissions
                    SET status = 'approved', reviewed_by = ?2, reviewed_at = ?3, review_notes = ?4
                    WHERE id = ?1 AND status = 'pending'
                    "#,
                    params![submission_id, admin_id, now, notes],
                )?;
                if claimed == 0 {
                    return Err(
                        ValidationError::Conflict(SUBMISSION_REVIEWED_MESSAGE.to_string()).into(),
                    );
                }

                let prompt_id = match Self::insert_prompt_sync(tx, &prompt)? {
                    Some(id) => id,
                    None => tx.query_row(
                        "SELECT id FROM prompts WHERE text_hash = ?1",
                        [text_hash(&prompt.text)],
                        |row| row.get(0),
                    )?,
                };

                tx.execute(
                    "UPDATE community_submissions SET prompt_id = ?2 WHERE id = ?1",
                    params![submission_id, prompt_id],
                )?;
                Ok(prompt_id)
            })
            .await
    }

    /// Record a non-approving review outcome
    pub async fn set_submission_review(
        &self,
        submission_id: i64,
        status: SubmissionStatus,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<bool> {
        let admin_id = admin_id.to_string();
        let now = now_timestamp();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE community_submissions
                    SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, review_notes = ?5
                    WHERE id = ?1 AND status = 'pending'
                    "#,
                    params![submission_id, status.to_string(), admin_id, now, notes],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    /// Submission totals by status and category
    pub async fn submission_counts(&self) -> Result<SubmissionCounts> {
        self.db
            .execute_async(|conn| {
                let mut counts = SubmissionCounts::default();

                let mut stmt = conn
                    .prepare("SELECT status, COUNT(*) FROM community_submissions GROUP BY status")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (status, count) = row?;
                    counts.total += count;
                    match status.parse::<SubmissionStatus>() {
                        Ok(SubmissionStatus::Pending) => counts.pending = count,
                        Ok(SubmissionStatus::Approved) => counts.approved = count,
                        Ok(SubmissionStatus::Rejected) => counts.rejected = count,
                        Ok(SubmissionStatus::ChangesRequested) => counts.changes_requested = count,
                        Err(_) => {}
                    }
                }

                let mut stmt = conn.prepare(
                    r#"
                    SELECT category, COUNT(*), COALESCE(AVG(quality_score), 0.0)
                    FROM community_submissions
                    GROUP BY category
                    ORDER BY category
                    "#,
                )?;
                counts.by_category = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(counts)
            })
            .await
    }

    // =========================================================================
    // Activity and Usage Operations
    // =========================================================================

    /// Rows created at or after `since`
    pub async fn recent_activity(&self, since: &str) -> Result<RecentActivity> {
        let since = since.to_string();

        self.db
            .execute_async(move |conn| {
                let count = |sql: &str| -> Result<i64> {
                    Ok(conn.query_row(sql, [&since], |row| row.get(0))?)
                };

                Ok(RecentActivity {
                    recent_translations: count(
                        "SELECT COUNT(*) FROM translations WHERE created_at >= ?1",
                    )?,
                    recent_users: count("SELECT COUNT(*) FROM users WHERE created_at >= ?1")?,
                    recent_submissions: count(
                        "SELECT COUNT(*) FROM community_submissions WHERE created_at >= ?1",
                    )?,
                })
            })
            .await
    }

    /// LLM calls recorded for a UTC day (`YYYY-MM-DD`)
    pub async fn api_calls_for_day(&self, day: &str) -> Result<u32> {
        let day = day.to_string();

        self.db
            .execute_async(move |conn| {
                let calls: Option<u32> = conn
                    .query_row("SELECT calls FROM api_usage WHERE day = ?1", [day], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(calls.unwrap_or(0))
            })
            .await
    }

    /// Count one LLM call against the day's budget if it is not yet spent
    pub async fn try_reserve_api_call(&self, day: &str, daily_limit: u32) -> Result<bool> {
        let day = day.to_string();

        self.db
            .transaction_async(move |tx| {
                tx.execute(
                    "INSERT OR IGNORE INTO api_usage (day, calls) VALUES (?1, 0)",
                    [&day],
                )?;
                let changed = tx.execute(
                    "UPDATE api_usage SET calls = calls + 1 WHERE day = ?1 AND calls < ?2",
                    params![day, daily_limit],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    /// Refill bookkeeping
    pub async fn cache_meta(&self) -> Result<CacheMeta> {
        self.db
            .execute_async(|conn| {
                let meta = conn
                    .query_row(
                        "SELECT last_refill, total_generated FROM cache_meta WHERE id = 1",
                        [],
                        |row| {
                            Ok(CacheMeta {
                                last_refill: row.get(0)?,
                                total_generated: row.get(1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(meta.unwrap_or_default())
            })
            .await
    }

    /// Stamp a completed refill and add its prompts to the running total
    pub async fn record_refill(&self, added: usize) -> Result<()> {
        let now = now_timestamp();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO cache_meta (id, last_refill, total_generated) VALUES (1, ?1, ?2)
                    ON CONFLICT(id) DO UPDATE SET last_refill = ?1, total_generated = total_generated + ?2
                    "#,
                    params![now, added as i64],
                )?;
                Ok(())
            })
            .await
    }

    /// Translations joined with prompts for export, newest first
    pub async fn export_rows(
        &self,
        status: Option<TranslationStatus>,
        limit: usize,
    ) -> Result<Vec<TranslationView>> {
        self.list_translations(status, limit, 0).await
    }
}
