/*!
 * Supply of English prompts for the pool.
 *
 * - `generator`: asks an LLM provider for short sentences, one call per prompt
 * - `dataset`: reads sentences from a local CSV file as a fallback source
 */

pub mod dataset;
pub mod generator;

pub use dataset::DatasetSource;
pub use generator::{
    assess_difficulty, clean_generated_text, seed_instruction, CallBudget, FixedBudget,
    GenerationReport, PromptGenerator, PROMPT_CATEGORIES,
};
