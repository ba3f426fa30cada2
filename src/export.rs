/*!
 * Translation export as JSON or CSV.
 */

use anyhow::{anyhow, Result};
use csv::{Terminator, WriterBuilder};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::database::models::{TranslationStatus, TranslationView};
use crate::database::Repository;

const CSV_HEADER: [&str; 5] = ["ID", "English", "Kikuyu", "Status", "Created At"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(anyhow!("Unsupported export format: {}", other)),
        }
    }
}

/// One exported translation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub id: i64,
    pub english: String,
    pub kikuyu: String,
    pub status: TranslationStatus,
    pub created_at: String,
}

impl From<TranslationView> for ExportRow {
    fn from(view: TranslationView) -> Self {
        Self {
            id: view.id,
            english: view.english,
            kikuyu: view.kikuyu,
            status: view.status,
            created_at: view.created_at,
        }
    }
}

/// Rendered export ready to be written or downloaded
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
    pub records: usize,
}

/// `translations_<status>.<ext>`, with `all` when no status filter applies
pub fn export_file_name(format: ExportFormat, status: Option<TranslationStatus>) -> String {
    let status = status.map_or_else(|| "all".to_string(), |s| s.to_string());
    format!("translations_{}.{}", status, format.extension())
}

/// CSV with a header row and CRLF line endings, fields quoted as needed
pub fn render_csv(rows: &[ExportRow]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record([
            row.id.to_string().as_str(),
            row.english.as_str(),
            row.kikuyu.as_str(),
            row.status.to_string().as_str(),
            row.created_at.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV export: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn render_json(rows: &[ExportRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Load up to `max_records` translations, newest first, and render them
pub async fn export_translations(
    repo: &Repository,
    format: ExportFormat,
    status: Option<TranslationStatus>,
    max_records: usize,
) -> Result<ExportFile> {
    let rows: Vec<ExportRow> = repo
        .export_rows(status, max_records)
        .await?
        .into_iter()
        .map(ExportRow::from)
        .collect();

    let body = match format {
        ExportFormat::Json => render_json(&rows)?,
        ExportFormat::Csv => render_csv(&rows)?,
    };

    Ok(ExportFile {
        file_name: export_file_name(format, status),
        content_type: format.content_type(),
        body,
        records: rows.len(),
    })
}
