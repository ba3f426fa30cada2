/*!
 * Database schema definitions and migrations.
 *
 * This module contains the SQL schema for all database tables
 * and handles schema migrations for version upgrades.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Foreign keys are a per-connection setting in SQLite
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // In-memory databases silently keep their own journal mode
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            last_activity TEXT NOT NULL,
            submission_count INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS prompts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            text_hash TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL DEFAULT 'general',
            source_type TEXT NOT NULL DEFAULT 'manual',
            difficulty_level TEXT NOT NULL DEFAULT 'basic',
            quality_score REAL NOT NULL DEFAULT 0.8,
            status TEXT NOT NULL DEFAULT 'available',
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            served_at TEXT,
            served_to TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_prompts_status ON prompts(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_prompts_category ON prompts(category);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prompt_id INTEGER NOT NULL REFERENCES prompts(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            kikuyu_text TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            ip_address TEXT,
            user_agent TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_translations_prompt ON translations(prompt_id);
        CREATE INDEX IF NOT EXISTS idx_translations_user ON translations(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_translations_status ON translations(status);
        "#,
    )?;

    // No foreign key: the audit trail outlives deleted translations
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS admin_actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            translation_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            admin_id TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_admin_actions_translation ON admin_actions(translation_id);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS community_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            category TEXT NOT NULL,
            difficulty_level TEXT NOT NULL DEFAULT 'basic',
            submitted_by TEXT,
            submission_ip TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            quality_score REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL,
            reviewed_by TEXT,
            reviewed_at TEXT,
            review_notes TEXT,
            prompt_id INTEGER REFERENCES prompts(id)
        );

        CREATE INDEX IF NOT EXISTS idx_submissions_status ON community_submissions(status);
        CREATE INDEX IF NOT EXISTS idx_submissions_ip ON community_submissions(submission_ip, created_at);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS api_usage (
            day TEXT PRIMARY KEY,
            calls INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS cache_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_refill TEXT,
            total_generated INTEGER NOT NULL DEFAULT 0
        );

        INSERT OR IGNORE INTO cache_meta (id, last_refill, total_generated) VALUES (1, NULL, 0);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    let current = from_version;

    // Future migration steps go here, one arm per source version
    if current < SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unknown schema version: {}. Cannot migrate.",
            current
        ));
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}
