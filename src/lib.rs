/*!
 * # Kikuyu Translate - crowdsourced English to Kikuyu translations
 *
 * A JSON web service that hands English sentences to volunteers, collects
 * their Kikuyu translations and lets an admin review them.
 *
 * ## Features
 *
 * - Prompt pool refilled from an LLM (OpenRouter) under a daily call quota
 * - CSV dataset fallback when the LLM is unavailable
 * - Prompts chosen per contributor to fill coverage gaps
 * - Duplicate-safe translation storage in SQLite
 * - Community-submitted English sentences with moderation
 * - Admin panel with moderation, cache control, statistics and export
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration from environment variables
 * - `database`: SQLite connection, schema, models and repository
 * - `providers`: LLM client implementations:
 *   - `providers::openrouter`: OpenRouter chat completions client
 *   - `providers::mock`: Scripted provider for tests
 * - `prompts`: LLM prompt generation and the CSV dataset source
 * - `prompt_cache`: Pool management, refills and the daily quota
 * - `selection`: Coverage-driven choice of the next prompt per contributor
 * - `validation`: Kikuyu text normalization and checks
 * - `community`: Submission validation, quality scoring and review
 * - `moderation`: Admin decisions on translations
 * - `rate_limit`: Sliding-window and daily submission limits
 * - `stats`: Aggregated platform and contributor statistics
 * - `export`: CSV and JSON export of translations
 * - `server`: axum router, middleware and handlers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod community;
pub mod database;
pub mod errors;
pub mod export;
pub mod moderation;
pub mod prompt_cache;
pub mod prompts;
pub mod providers;
pub mod rate_limit;
pub mod selection;
pub mod server;
pub mod stats;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::Repository;
pub use errors::{AppError, ProviderError, ValidationError};
pub use prompt_cache::PromptCache;
pub use server::{create_router, run_server, AppState};
