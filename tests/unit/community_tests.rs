/*!
 * Tests for community sentence submissions and their review
 */

use kikuyu_translate::community::{CommunityService, SubmissionInput};
use kikuyu_translate::database::models::{
    Difficulty, NewPrompt, PromptStatus, SourceType, SubmissionStatus,
};
use kikuyu_translate::database::Repository;
use kikuyu_translate::errors::ValidationError;

use crate::common;

const FAMILY_SENTENCE: &str = "My mother cooks beans for the family every evening.";
const FARM_SENTENCE: &str = "The farmer will plant maize in the field.";

fn service() -> (CommunityService, Repository) {
    let repo = Repository::new_in_memory().unwrap();
    (CommunityService::new(repo.clone(), 10), repo)
}

fn submission(text: &str) -> SubmissionInput {
    SubmissionInput {
        text: text.to_string(),
        submitted_by: Some("session-1".to_string()),
        client_ip: Some("192.0.2.10".to_string()),
        ..Default::default()
    }
}

fn validation_error(err: anyhow::Error) -> ValidationError {
    err.downcast::<ValidationError>().expect("a validation error")
}

#[tokio::test]
async fn test_approvedSubmission_shouldBeServedAsCommunityPrompt() {
    let (service, repo) = service();
    let receipt = service.submit(submission(FAMILY_SENTENCE)).await.unwrap();
    assert_eq!(receipt.category, "family");

    let outcome = service
        .review(receipt.submission_id, "approve", "admin", Some("nice".to_string()))
        .await
        .unwrap();
    let prompt_id = outcome.prompt_id.expect("approval creates a prompt");

    let prompt = repo.claim_next_prompt("reader", None).await.unwrap().unwrap();
    assert_eq!(prompt.id, prompt_id);
    assert_eq!(prompt.text, FAMILY_SENTENCE);
    assert_eq!(prompt.source_type, SourceType::Community);
    assert_eq!(prompt.status, PromptStatus::Served);
    assert!(service.pending(50, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_review_twice_shouldRefuseSecondDecision() {
    let (service, _repo) = service();
    let receipt = service.submit(submission(FARM_SENTENCE)).await.unwrap();

    let outcome = service
        .review(receipt.submission_id, "request_changes", "admin", None)
        .await
        .unwrap();
    assert_eq!(outcome.message, "Changes requested");
    assert!(outcome.prompt_id.is_none());

    let err = service
        .review(receipt.submission_id, "approve", "admin", None)
        .await
        .unwrap_err();
    assert_eq!(
        validation_error(err),
        ValidationError::Conflict("Submission already reviewed".to_string())
    );
}

#[tokio::test]
async fn test_submit_matchingExistingPrompt_shouldBeDuplicate() {
    let (service, repo) = service();
    common::seed_prompts(&repo, &[FARM_SENTENCE]).await.unwrap();

    let err = service
        .submit(submission("the farmer will plant maize in the field."))
        .await
        .unwrap_err();

    assert!(matches!(validation_error(err), ValidationError::Duplicate(_)));
    assert!(service.is_duplicate(FARM_SENTENCE).await.unwrap().is_some());
}

#[tokio::test]
async fn test_pending_withCategory_shouldFilter() {
    let (service, _repo) = service();
    service.submit(submission(FAMILY_SENTENCE)).await.unwrap();
    service.submit(submission(FARM_SENTENCE)).await.unwrap();

    let all = service.pending(50, None).await.unwrap();
    let farming = service
        .pending(50, Some("agriculture".to_string()))
        .await
        .unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(farming.len(), 1);
    assert_eq!(farming[0].text, FARM_SENTENCE);
}

#[tokio::test]
async fn test_stats_afterMixedReviews_shouldReportRates() {
    let (service, _repo) = service();
    let first = service.submit(submission(FAMILY_SENTENCE)).await.unwrap();
    let second = service.submit(submission(FARM_SENTENCE)).await.unwrap();

    service.review(first.submission_id, "approve", "admin", None).await.unwrap();
    service.review(second.submission_id, "reject", "admin", None).await.unwrap();

    let stats = service.stats().await.unwrap();
    assert_eq!(stats.total_submissions, 2);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.pending_review, 0);
    assert_eq!(stats.approval_rate, 50.0);
    assert_eq!(stats.recent_submissions_week, 2);
    assert_eq!(stats.category_breakdown.len(), 2);
}

#[tokio::test]
async fn test_review_concurrentDecisions_shouldApplyOnlyOne() {
    let (service, repo) = service();
    let receipt = service.submit(submission(FAMILY_SENTENCE)).await.unwrap();

    let (first, second) = tokio::join!(
        service.review(receipt.submission_id, "approve", "admin-a", None),
        service.review(receipt.submission_id, "reject", "admin-b", None),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(repo.prompt_counts().await.unwrap().total as usize, usize::from(results[0].is_ok()));

    let err = results.into_iter().find_map(Result::err).expect("one review loses");
    assert_eq!(
        validation_error(err),
        ValidationError::Conflict("Submission already reviewed".to_string())
    );
}

#[tokio::test]
async fn test_reviewUpdates_onDecidedSubmission_shouldChangeNothing() {
    let (service, repo) = service();
    let receipt = service.submit(submission(FARM_SENTENCE)).await.unwrap();
    service.review(receipt.submission_id, "reject", "admin", None).await.unwrap();

    let prompt = NewPrompt::new(FARM_SENTENCE, "agriculture", SourceType::Community, Difficulty::Basic);
    let err = repo
        .approve_submission(receipt.submission_id, prompt, "admin", None)
        .await
        .unwrap_err();
    assert!(matches!(validation_error(err), ValidationError::Conflict(_)));
    assert!(!repo
        .set_submission_review(receipt.submission_id, SubmissionStatus::ChangesRequested, "admin", None)
        .await
        .unwrap());

    assert_eq!(repo.prompt_counts().await.unwrap().total, 0);
    let stored = repo.get_submission(receipt.submission_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Rejected);
}
