/*!
 * Local CSV dataset used as a fallback prompt source.
 *
 * The file must have a header row with an `English` column. Other columns
 * are ignored and rows may have differing field counts.
 */

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim};
use log::info;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::community::auto_categorize;
use crate::database::models::{NewPrompt, SourceType};
use crate::database::Repository;
use crate::prompts::generator::assess_difficulty;

/// Column holding the English sentences
const ENGLISH_COLUMN: &str = "English";

/// Sentences this short or shorter are skipped
const MIN_SENTENCE_CHARS: usize = 10;

/// English sentences loaded from a CSV file
#[derive(Debug, Clone)]
pub struct DatasetSource {
    path: PathBuf,
    sentences: Vec<String>,
}

impl DatasetSource {
    /// Load the `English` column of a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path)
            .with_context(|| format!("Failed to read dataset file: {:?}", path))?;

        let sentences = Self::sentences_from_reader(file)
            .with_context(|| format!("Invalid dataset file: {:?}", path))?;

        info!("Loaded {} English sentences from {:?}", sentences.len(), path);
        Ok(Self { path, sentences })
    }

    /// Read the `English` column, skipping sentences that are too short
    pub fn sentences_from_reader<R: Read>(input: R) -> Result<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        let column = reader
            .headers()
            .context("Dataset has no header row")?
            .iter()
            .position(|name| name.trim_start_matches('\u{feff}') == ENGLISH_COLUMN)
            .ok_or_else(|| anyhow!("Dataset has no '{}' column", ENGLISH_COLUMN))?;

        let mut sentences = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed dataset row {}", line + 2))?;
            if let Some(text) = record.get(column) {
                if text.chars().count() > MIN_SENTENCE_CHARS {
                    sentences.push(text.to_string());
                }
            }
        }

        Ok(sentences)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Pick up to `count` random sentences that are not yet prompts
    pub async fn take_unused(&self, count: usize, repo: &Repository) -> Result<Vec<NewPrompt>> {
        if count == 0 || self.sentences.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = self.sentences.clone();
        candidates.shuffle(&mut rand::rng());
        let mut seen = HashSet::new();
        candidates.retain(|text| seen.insert(text.to_lowercase()));

        let unused = repo.filter_unknown_texts(candidates).await?;

        Ok(unused
            .into_iter()
            .take(count)
            .map(|text| {
                let category = auto_categorize(&text);
                let difficulty = assess_difficulty(&text);
                NewPrompt::new(text, category, SourceType::Dataset, difficulty)
            })
            .collect())
    }
}
