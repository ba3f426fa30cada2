/*!
 * Shared application state handed to every handler.
 */

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::app_config::Config;
use crate::community::CommunityService;
use crate::database::Repository;
use crate::moderation::ModerationService;
use crate::prompt_cache::PromptCache;
use crate::rate_limit::SlidingWindowLimiter;

use super::session::AdminSessions;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub repo: Repository,
    pub cache: PromptCache,
    pub community: CommunityService,
    pub moderation: ModerationService,
    pub api_limiter: SlidingWindowLimiter,
    pub admin_sessions: AdminSessions,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build the state with the prompt cache described by the config
    pub fn new(config: Config, repo: Repository) -> Self {
        let cache = PromptCache::from_config(&config, repo.clone());
        Self::with_cache(config, repo, cache)
    }

    /// Build the state around an already configured prompt cache
    pub fn with_cache(config: Config, repo: Repository, cache: PromptCache) -> Self {
        Self {
            community: CommunityService::new(
                repo.clone(),
                config.limits.community_submissions_per_hour,
            ),
            moderation: ModerationService::new(repo.clone()),
            api_limiter: SlidingWindowLimiter::from_spec(&config.limits.api_rate_limit),
            admin_sessions: AdminSessions::new(config.security.admin_session_hours),
            started_at: Utc::now(),
            cache,
            repo,
            config,
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
