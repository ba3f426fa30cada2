/*!
 * Database module for persistent storage of the translation corpus.
 *
 * This module provides SQLite-based persistence for:
 * - Contributors identified by their session cookie
 * - The prompt pool and its serving state
 * - Translations, moderation history and community submissions
 * - Daily LLM usage accounting
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
