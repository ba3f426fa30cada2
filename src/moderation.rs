/*!
 * Admin moderation of submitted translations.
 *
 * Approving or flagging changes the status in place. Rejecting deletes the
 * translation and puts its prompt back into the pool so someone else can
 * translate it. Every decision is written to the audit log.
 */

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::database::models::TranslationStatus;
use crate::database::Repository;
use crate::errors::ValidationError;

/// Decision an admin can take on a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    Flag,
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Flag => "flag",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ModerationAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            "flag" => Ok(ModerationAction::Flag),
            _ => Err(ValidationError::BadRequest("Invalid action".to_string())),
        }
    }
}

/// Result of a moderation decision
#[derive(Debug, Clone, Serialize)]
pub struct ModerationOutcome {
    pub success: bool,
    pub translation_id: i64,
    pub action: ModerationAction,
    pub message: String,
    /// Prompt returned to the pool by a rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_prompt_id: Option<i64>,
}

/// Translation moderation
#[derive(Clone)]
pub struct ModerationService {
    repo: Repository,
}

impl ModerationService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Apply `action` to a translation
    pub async fn moderate(
        &self,
        translation_id: i64,
        action: ModerationAction,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<ModerationOutcome> {
        let not_found = || ValidationError::NotFound("Translation not found".to_string());
        let action_name = action.to_string();

        let (message, released_prompt_id) = match action {
            ModerationAction::Approve | ModerationAction::Flag => {
                let status = if action == ModerationAction::Approve {
                    TranslationStatus::Approved
                } else {
                    TranslationStatus::Flagged
                };

                let updated = self
                    .repo
                    .update_translation_status_logged(translation_id, status, &action_name, admin_id, notes)
                    .await?;
                if !updated {
                    return Err(not_found().into());
                }
                (format!("Translation {}", status), None)
            }
            ModerationAction::Reject => {
                let prompt_id = self
                    .repo
                    .delete_translation_logged(translation_id, &action_name, admin_id, notes)
                    .await?
                    .ok_or_else(not_found)?;
                (
                    "Translation rejected and prompt returned to the pool".to_string(),
                    Some(prompt_id),
                )
            }
        };

        info!(
            "Admin {} applied {} to translation {}",
            admin_id, action_name, translation_id
        );

        Ok(ModerationOutcome {
            success: true,
            translation_id,
            action,
            message,
            released_prompt_id,
        })
    }

    /// Apply the reject path to translations stored with status `rejected`
    ///
    /// Returns the number of translations removed.
    pub async fn cleanup_rejected(&self, admin_id: &str) -> Result<usize> {
        let ids = self.repo.rejected_translation_ids().await?;
        let mut removed = 0;

        for id in ids {
            match self
                .repo
                .delete_translation_logged(
                    id,
                    "cleanup_reject",
                    admin_id,
                    Some("Removed legacy rejected translation".to_string()),
                )
                .await
            {
                Ok(Some(_)) => removed += 1,
                Ok(None) => {}
                Err(e) => warn!("Failed to clean up translation {}: {:#}", id, e),
            }
        }

        info!("Cleaned up {} rejected translations", removed);
        Ok(removed)
    }
}
