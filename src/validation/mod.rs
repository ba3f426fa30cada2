/*!
 * Validation of contributed Kikuyu translations.
 *
 * Contributors type free text, so every submission is normalized and
 * checked against a small set of content rules before it is stored:
 * - non-empty, between 2 and 1000 characters
 * - not made only of digits
 * - no character repeated ten or more times in a row
 * - only letters (any script, with diacritics), digits, whitespace and
 *   basic punctuation
 */

use log::debug;

use crate::errors::ValidationError;

/// Minimum translation length in characters
pub const MIN_TRANSLATION_CHARS: usize = 2;

/// Maximum translation length in characters
pub const MAX_TRANSLATION_CHARS: usize = 1000;

/// Consecutive identical characters that mark a submission as junk
const MAX_REPEATED_RUN: usize = 10;

/// Punctuation accepted in translations
const ALLOWED_PUNCTUATION: &str = ".,!?;:'\"()-";

/// Reasons a translation is refused
#[derive(Debug, Clone, PartialEq)]
pub enum TextIssue {
    Empty,
    TooShort,
    TooLong,
    OnlyNumbers,
    RepeatedCharacters,
    InvalidCharacter(char),
}

impl std::fmt::Display for TextIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextIssue::Empty => write!(f, "Translation cannot be empty"),
            TextIssue::TooShort => write!(f, "Translation is too short"),
            TextIssue::TooLong => write!(
                f,
                "Translation is too long (maximum {} characters)",
                MAX_TRANSLATION_CHARS
            ),
            TextIssue::OnlyNumbers => write!(f, "Translation cannot be only numbers"),
            TextIssue::RepeatedCharacters => {
                write!(f, "Translation contains too many repeated characters")
            }
            TextIssue::InvalidCharacter(c) => {
                write!(f, "Translation contains invalid character: '{}'", c)
            }
        }
    }
}

impl From<TextIssue> for ValidationError {
    fn from(issue: TextIssue) -> Self {
        ValidationError::InvalidText(issue.to_string())
    }
}

/// Trim and collapse internal whitespace runs to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key under which two translations count as the same
pub fn duplicate_key(text: &str) -> String {
    normalize_text(text).to_lowercase()
}

/// Combining marks used to compose diacritics
fn is_combining_mark(c: char) -> bool {
    matches!(
        c,
        '\u{0300}'..='\u{036F}'
            | '\u{1AB0}'..='\u{1AFF}'
            | '\u{1DC0}'..='\u{1DFF}'
            | '\u{20D0}'..='\u{20FF}'
            | '\u{FE20}'..='\u{FE2F}'
    )
}

fn is_allowed_char(c: char) -> bool {
    c.is_alphabetic()
        || c.is_numeric()
        || c.is_whitespace()
        || ALLOWED_PUNCTUATION.contains(c)
        || is_combining_mark(c)
}

fn has_repeated_run(text: &str) -> bool {
    let mut previous = None;
    let mut run = 0;

    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= MAX_REPEATED_RUN {
            return true;
        }
    }
    false
}

/// Check a translation against the content rules
pub fn check_kikuyu_text(text: &str) -> Result<(), TextIssue> {
    let text = text.trim();

    if text.is_empty() {
        return Err(TextIssue::Empty);
    }

    let char_count = text.chars().count();
    if char_count < MIN_TRANSLATION_CHARS {
        return Err(TextIssue::TooShort);
    }
    if char_count > MAX_TRANSLATION_CHARS {
        return Err(TextIssue::TooLong);
    }

    if text.chars().all(char::is_numeric) {
        return Err(TextIssue::OnlyNumbers);
    }

    if has_repeated_run(text) {
        return Err(TextIssue::RepeatedCharacters);
    }

    if let Some(bad) = text.chars().find(|c| !is_allowed_char(*c)) {
        debug!("Rejected translation with character U+{:04X}", bad as u32);
        return Err(TextIssue::InvalidCharacter(bad));
    }

    Ok(())
}

/// Validate a translation and return its normalized form
pub fn validate_kikuyu_text(text: &str) -> Result<String, ValidationError> {
    check_kikuyu_text(text)?;
    Ok(normalize_text(text))
}
