/*!
 * Prompt cache management.
 *
 * The cache is the set of `available` prompts. When it drops below the
 * low-water mark a refill asks the LLM for new sentences, spending at most
 * the remaining daily call quota, and falls back to the CSV dataset for
 * whatever the LLM could not supply. Only one refill runs at a time.
 */

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::database::models::{format_timestamp, PromptRecord};
use crate::database::Repository;
use crate::errors::ProviderError;
use crate::prompts::{CallBudget, DatasetSource, PromptGenerator};
use crate::providers::OpenRouter;
use crate::selection::{refill_categories, SelectionPlan};

/// Current UTC day as stored in `api_usage`
pub fn utc_day() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Daily LLM quota backed by the `api_usage` table
pub struct DailyQuota {
    repo: Repository,
    day: String,
    limit: u32,
}

impl DailyQuota {
    /// Quota for the current UTC day
    pub fn today(repo: Repository, limit: u32) -> Self {
        Self {
            repo,
            day: utc_day(),
            limit,
        }
    }
}

#[async_trait]
impl CallBudget for DailyQuota {
    async fn try_acquire(&self) -> bool {
        match self.repo.try_reserve_api_call(&self.day, self.limit).await {
            Ok(granted) => granted,
            Err(e) => {
                error!("Failed to record API usage: {:#}", e);
                false
            }
        }
    }
}

/// Sizing and quota settings
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub min_cache_size: usize,
    pub batch_size: usize,
    pub max_age_days: i64,
    pub daily_limit: u32,
}

impl CacheSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_cache_size: config.cache.min_cache_size,
            batch_size: config.cache.batch_size,
            max_age_days: config.cache.max_age_days,
            daily_limit: config.openrouter.daily_limit,
        }
    }
}

/// Health label derived from the number of available prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHealth {
    Healthy,
    Low,
    Empty,
}

impl CacheHealth {
    pub fn classify(available: i64, min_cache_size: usize) -> Self {
        if available <= 0 {
            CacheHealth::Empty
        } else if (available as usize) < min_cache_size {
            CacheHealth::Low
        } else {
            CacheHealth::Healthy
        }
    }
}

/// Snapshot of the prompt pool and LLM usage
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total: i64,
    pub available: i64,
    pub served: i64,
    pub retired: i64,
    pub health: CacheHealth,
    pub min_cache_size: usize,
    pub last_refill: Option<String>,
    pub total_generated: i64,
    pub api_calls_today: u32,
    pub daily_limit: u32,
    pub remaining_calls: u32,
    pub llm_configured: bool,
    pub dataset_sentences: usize,
}

/// Where the prompts of a refill came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefillSource {
    Llm,
    Dataset,
    Mixed,
    None,
}

/// Why a refill did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefillSkip {
    /// Another refill holds the lock
    AlreadyRunning,
    /// Enough prompts are available and the refill was not forced
    NotNeeded,
}

/// Result of a refill attempt
#[derive(Debug, Clone, Serialize)]
pub struct RefillOutcome {
    /// Prompts newly added to the pool
    pub added: usize,
    pub llm_added: usize,
    pub dataset_added: usize,
    pub source: RefillSource,
    /// LLM calls spent
    pub calls_made: usize,
    pub skipped_reason: Option<RefillSkip>,
    /// Set when the LLM batch stopped on a fatal error
    pub llm_error: Option<String>,
}

impl RefillOutcome {
    fn skipped(reason: RefillSkip) -> Self {
        Self {
            added: 0,
            llm_added: 0,
            dataset_added: 0,
            source: RefillSource::None,
            calls_made: 0,
            skipped_reason: Some(reason),
            llm_error: None,
        }
    }
}

/// Manager for the pool of available prompts
#[derive(Clone)]
pub struct PromptCache {
    repo: Repository,
    generator: Option<PromptGenerator>,
    dataset: Option<Arc<DatasetSource>>,
    settings: CacheSettings,
    refill_lock: Arc<Mutex<()>>,
}

impl PromptCache {
    pub fn new(
        repo: Repository,
        generator: Option<PromptGenerator>,
        dataset: Option<DatasetSource>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            repo,
            generator,
            dataset: dataset.map(Arc::new),
            settings,
            refill_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Build the cache with the OpenRouter client and dataset named in the config
    pub fn from_config(config: &Config, repo: Repository) -> Self {
        let generator = if config.openrouter.is_configured() {
            let provider = Arc::new(OpenRouter::from_config(&config.openrouter));
            Some(PromptGenerator::new(provider, config.openrouter.request_delay()))
        } else {
            warn!("OPENROUTER_API_KEY not set, LLM prompt generation disabled");
            None
        };

        let dataset = config
            .cache
            .dataset_file
            .as_ref()
            .and_then(|path| match DatasetSource::load(path) {
                Ok(dataset) => Some(dataset),
                Err(e) => {
                    warn!("Prompt dataset unavailable: {:#}", e);
                    None
                }
            });

        Self::new(repo, generator, dataset, CacheSettings::from_config(config))
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Whether a refill currently holds the lock
    pub fn refill_in_progress(&self) -> bool {
        self.refill_lock.try_lock().is_err()
    }

    /// Pool and quota snapshot
    pub async fn stats(&self) -> Result<CacheStats> {
        let counts = self.repo.prompt_counts().await?;
        let meta = self.repo.cache_meta().await?;
        let api_calls_today = self.repo.api_calls_for_day(&utc_day()).await?;

        Ok(CacheStats {
            total: counts.total,
            available: counts.available,
            served: counts.served,
            retired: counts.retired,
            health: CacheHealth::classify(counts.available, self.settings.min_cache_size),
            min_cache_size: self.settings.min_cache_size,
            last_refill: meta.last_refill,
            total_generated: meta.total_generated,
            api_calls_today,
            daily_limit: self.settings.daily_limit,
            remaining_calls: self.settings.daily_limit.saturating_sub(api_calls_today),
            llm_configured: self.generator.is_some(),
            dataset_sentences: self.dataset.as_ref().map_or(0, |d| d.len()),
        })
    }

    /// Hand the oldest available prompt to a session, preferred category first
    pub async fn next_prompt(
        &self,
        session_id: &str,
        preferred_category: Option<String>,
    ) -> Result<Option<PromptRecord>> {
        self.serve(session_id, SelectionPlan::preferring(preferred_category))
            .await
    }

    /// Hand the prompt ranked best by `plan` to a session
    ///
    /// Starts a background refill when the pool is low, and refills inline
    /// once when nothing is available.
    pub async fn serve(&self, session_id: &str, plan: SelectionPlan) -> Result<Option<PromptRecord>> {
        let counts = self.repo.prompt_counts().await?;
        if counts.available > 0 && (counts.available as usize) < self.settings.min_cache_size {
            self.spawn_background_refill();
        }

        if let Some(prompt) = self.repo.claim_prompt(session_id, plan.clone()).await? {
            return Ok(Some(prompt));
        }

        info!("No prompt available for {:?} selection, refilling before serving", plan.strategy);
        match self.refill(false).await {
            Ok(outcome) => debug!("Inline refill added {} prompts", outcome.added),
            Err(e) => error!("Inline refill failed: {:#}", e),
        }

        self.repo.claim_prompt(session_id, plan).await
    }

    /// Start a refill on a detached task unless one is already running
    pub fn spawn_background_refill(&self) -> Option<JoinHandle<()>> {
        if self.refill_in_progress() {
            return None;
        }

        let cache = self.clone();
        Some(tokio::spawn(async move {
            match cache.refill(false).await {
                Ok(outcome) if outcome.added > 0 => {
                    info!("Background refill added {} prompts", outcome.added)
                }
                Ok(outcome) => debug!("Background refill: {:?}", outcome.skipped_reason),
                Err(e) => error!("Background refill failed: {:#}", e),
            }
        }))
    }

    /// Top the pool up, from the LLM first and then the dataset
    pub async fn refill(&self, force: bool) -> Result<RefillOutcome> {
        let Ok(_guard) = self.refill_lock.try_lock() else {
            debug!("Refill already running");
            return Ok(RefillOutcome::skipped(RefillSkip::AlreadyRunning));
        };

        let counts = self.repo.prompt_counts().await?;
        let available = counts.available.max(0) as usize;
        if !force && available >= self.settings.min_cache_size {
            return Ok(RefillOutcome::skipped(RefillSkip::NotNeeded));
        }

        let needed = self
            .settings
            .batch_size
            .max(self.settings.min_cache_size.saturating_sub(available));
        info!(
            "Refilling prompt cache: {} available, requesting {}",
            available, needed
        );

        let mut llm_added = 0;
        let mut calls_made = 0;
        let mut llm_error = None;

        if let Some(generator) = &self.generator {
            let quota = DailyQuota::today(self.repo.clone(), self.settings.daily_limit);
            let categories = refill_categories(&self.repo.category_rows().await?);
            let report = generator.generate_batch(needed, &categories, &quota).await;
            calls_made = report.calls_made;
            llm_error = report.aborted;
            llm_added = self.repo.insert_prompts(report.prompts).await?;
        }

        let mut dataset_added = 0;
        if llm_added < needed {
            if let Some(dataset) = &self.dataset {
                let prompts = dataset.take_unused(needed - llm_added, &self.repo).await?;
                dataset_added = self.repo.insert_prompts(prompts).await?;
            }
        }

        let added = llm_added + dataset_added;
        self.repo.record_refill(added).await?;

        let source = match (llm_added > 0, dataset_added > 0) {
            (true, true) => RefillSource::Mixed,
            (true, false) => RefillSource::Llm,
            (false, true) => RefillSource::Dataset,
            (false, false) => RefillSource::None,
        };

        if added == 0 {
            warn!("Refill added no prompts ({} LLM calls)", calls_made);
        } else {
            info!(
                "Refill added {} prompts ({} from LLM, {} from dataset, {} calls)",
                added, llm_added, dataset_added, calls_made
            );
        }

        Ok(RefillOutcome {
            added,
            llm_added,
            dataset_added,
            source,
            calls_made,
            skipped_reason: None,
            llm_error,
        })
    }

    /// Return a prompt held by `session_id` to the pool
    pub async fn release(&self, prompt_id: i64, session_id: &str) -> Result<bool> {
        self.repo.release_prompt(prompt_id, session_id).await
    }

    /// Take an available prompt out of the pool
    pub async fn mark_served(&self, prompt_id: i64) -> Result<bool> {
        self.repo.mark_prompt_served(prompt_id).await
    }

    /// Return all served prompts to the pool and zero usage counts
    pub async fn reset(&self) -> Result<usize> {
        let released = self.repo.reset_served_prompts().await?;
        info!("Prompt cache reset, {} prompts returned to the pool", released);
        Ok(released)
    }

    /// Retire available prompts older than `max_age_days`
    pub async fn cleanup(&self, max_age_days: i64) -> Result<usize> {
        let cutoff = format_timestamp(Utc::now() - ChronoDuration::days(max_age_days));
        let retired = self.repo.retire_prompts_before(&cutoff).await?;
        if retired > 0 {
            info!("Retired {} prompts older than {} days", retired, max_age_days);
        }
        Ok(retired)
    }

    /// Spend one call of today's quota on a sample generation
    pub async fn test_connection(&self) -> Result<String, ProviderError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("API key not configured".to_string()))?;

        let quota = DailyQuota::today(self.repo.clone(), self.settings.daily_limit);
        if !quota.try_acquire().await {
            return Err(ProviderError::RateLimitExceeded(
                "Daily OpenRouter call limit reached".to_string(),
            ));
        }

        generator
            .generate_one(Some("general"))
            .await?
            .ok_or_else(|| ProviderError::ParseError("Failed to generate test prompt".to_string()))
    }
}
