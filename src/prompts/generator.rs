/*!
 * LLM-backed prompt generation.
 *
 * Each generated prompt costs one chat completion. Calls are made
 * sequentially with a configurable pause between them, and every attempt
 * must first be granted by a `CallBudget` so the daily quota holds even
 * when other callers share it.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::database::models::{Difficulty, NewPrompt, SourceType};
use crate::providers::{CompletionRequest, Provider};

/// Categories cycled through when generating a batch
pub const PROMPT_CATEGORIES: &[&str] = &[
    "greetings", "family", "farming", "health", "school", "weather", "general",
];

/// Longest accepted generated sentence, in words
const MAX_GENERATED_WORDS: usize = 25;

/// Shortest accepted generated sentence, in characters (exclusive)
const MIN_GENERATED_CHARS: usize = 5;

/// Words longer than this count as long when grading difficulty
const LONG_WORD_CHARS: usize = 8;

/// Grants permission for individual LLM calls
#[async_trait]
pub trait CallBudget: Send + Sync {
    /// Claim one call, `false` when the budget is spent
    async fn try_acquire(&self) -> bool;
}

/// Budget holding a fixed number of calls
#[derive(Debug)]
pub struct FixedBudget {
    remaining: AtomicUsize,
}

impl FixedBudget {
    pub fn new(calls: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(calls),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallBudget for FixedBudget {
    async fn try_acquire(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Instruction sent to the model for one sentence
pub fn seed_instruction(category: Option<&str>) -> String {
    let focus = match category {
        Some("greetings") => "Focus on common greetings and social interactions.",
        Some("family") => "Focus on family relationships, children, and household topics.",
        Some("farming") => "Focus on agriculture, crops, livestock, and farming activities.",
        Some("health") => "Focus on health, wellness, and medical topics.",
        Some("school") => "Focus on education, learning, and school activities.",
        Some("weather") => "Focus on weather, seasons, and natural phenomena.",
        Some(_) => "Focus on everyday activities and common situations.",
        None => {
            "The sentence should be about everyday life, culture, or common activities that would be familiar to Kikuyu speakers."
        }
    };

    format!(
        "Generate a simple, culturally appropriate English sentence for Kikuyu translation. {} \
         Keep it simple, clear, and under 20 words. Return only the English sentence, nothing else.",
        focus
    )
}

/// Reduce a raw completion to a single usable sentence
///
/// Takes the first non-empty line, strips surrounding quotes and rejects
/// results of 5 characters or fewer, or more than 25 words.
pub fn clean_generated_text(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let cleaned = line
        .trim_matches(|c| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim();

    let words = cleaned.split_whitespace().count();
    if cleaned.chars().count() > MIN_GENERATED_CHARS && words <= MAX_GENERATED_WORDS {
        Some(cleaned.to_string())
    } else {
        None
    }
}

/// Grade a sentence by word count and number of long words
pub fn assess_difficulty(text: &str) -> Difficulty {
    let words: Vec<&str> = text.split_whitespace().collect();
    let long_words = words
        .iter()
        .filter(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric()).chars().count() > LONG_WORD_CHARS
        })
        .count();

    if words.len() <= 8 && long_words <= 1 {
        Difficulty::Basic
    } else if words.len() <= 15 && long_words <= 3 {
        Difficulty::Intermediate
    } else {
        Difficulty::Advanced
    }
}

/// Outcome of a generation batch
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Accepted prompts, unique within the batch
    pub prompts: Vec<NewPrompt>,
    /// Provider calls actually made
    pub calls_made: usize,
    /// Calls that failed or produced unusable text
    pub failures: usize,
    /// Set when a fatal provider error stopped the batch early
    pub aborted: Option<String>,
}

/// Generates prompts through an LLM provider
#[derive(Clone)]
pub struct PromptGenerator {
    provider: Arc<dyn Provider>,
    request_delay: Duration,
}

impl PromptGenerator {
    pub fn new(provider: Arc<dyn Provider>, request_delay: Duration) -> Self {
        Self {
            provider,
            request_delay,
        }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Ask the provider for a single sentence in a category
    ///
    /// `Ok(None)` means the model answered but the text was unusable.
    pub async fn generate_one(
        &self,
        category: Option<&str>,
    ) -> Result<Option<String>, crate::errors::ProviderError> {
        let request = CompletionRequest::new(self.provider.model())
            .add_user_message(seed_instruction(category));

        let response = self.provider.complete(request).await?;
        let cleaned = clean_generated_text(&response.text);
        match &cleaned {
            Some(text) => debug!("Generated prompt: {}", text),
            None => warn!("Generated text doesn't meet criteria: {:?}", response.text),
        }
        Ok(cleaned)
    }

    /// Generate up to `count` prompts, one provider call each, within `budget`
    ///
    /// Cycles through `categories` in order, or the default category list
    /// when it is empty.
    pub async fn generate_batch(
        &self,
        count: usize,
        categories: &[&str],
        budget: &dyn CallBudget,
    ) -> GenerationReport {
        let categories = if categories.is_empty() {
            PROMPT_CATEGORIES
        } else {
            categories
        };
        let mut report = GenerationReport::default();
        let mut seen = HashSet::new();

        for i in 0..count {
            if !budget.try_acquire().await {
                info!("Call budget exhausted after {} calls", report.calls_made);
                break;
            }

            if report.calls_made > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let category = categories[i % categories.len()];
            report.calls_made += 1;

            match self.generate_one(Some(category)).await {
                Ok(Some(text)) => {
                    if seen.insert(text.to_lowercase()) {
                        let difficulty = assess_difficulty(&text);
                        report
                            .prompts
                            .push(NewPrompt::new(text, category, SourceType::Llm, difficulty));
                    }
                }
                Ok(None) => report.failures += 1,
                Err(e) if e.is_fatal() => {
                    warn!("Aborting prompt generation: {}", e);
                    report.failures += 1;
                    report.aborted = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    warn!("Failed to generate prompt {}: {}", i + 1, e);
                    report.failures += 1;
                }
            }
        }

        info!(
            "Generated {} out of {} requested prompts ({} calls, {} failures)",
            report.prompts.len(),
            count,
            report.calls_made,
            report.failures
        );
        report
    }
}
