//! Tests for the reconciliation driver ordering and dry-run invariants.

use std::sync::Arc;

use super::*;
use crate::policy::AUTOMATED_PR_TITLE;
use crate::test_support::{test_config, MockRepositoryClient, RecordingReporter};

async fn run_with(mock: &MockRepositoryClient, dry_run: bool) -> RecordingReporter {
    let bot = PolicyBot::new(Arc::new(mock.clone()), &test_config())
        .await
        .unwrap();
    let reporter = RecordingReporter::default();
    run(&bot, dry_run, &reporter).await.unwrap();
    reporter
}

fn compliant_mock() -> MockRepositoryClient {
    MockRepositoryClient {
        existing_paths: vec!["CODEOWNERS".to_string()],
        team_manages: true,
        require_code_owner_reviews: true,
        branch: Some(crate::test_support::test_branch(true)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_compliant_repository_reports_three_ok_lines_and_mutates_nothing() {
    let mock = compliant_mock();
    let reporter = run_with(&mock, false).await;

    let lines = reporter.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.starts_with("[OK] acme/widgets:")));
    assert!(mock.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_missing_codeowners_remediates_and_stops() {
    // acme/widgets with no CODEOWNERS at any path and no automated PR.
    let mock = MockRepositoryClient::default();
    let reporter = run_with(&mock, false).await;

    let mutating = mock.mutating_calls();
    assert_eq!(mutating.len(), 3);
    assert!(mutating[0].starts_with("create_branch add-codeowners-shepherd-"));
    assert!(mutating[1].contains("content=* @acme/platform-team"));
    assert!(mutating[2].contains("title=[AUTOMATED] Adding CODEOWNERS file"));

    // Processing stops: no team-management or protection calls this run.
    let calls = mock.calls();
    assert!(calls.iter().all(|call| !call.starts_with("get_team_repository")));
    assert!(calls.iter().all(|call| !call.starts_with("set_branch_protection")));
    assert!(calls.iter().all(|call| !call.starts_with("get_review_enforcement")));

    let lines = reporter.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[UPDATE REQUIRED] acme/widgets:"));
    assert!(lines[1].starts_with("[UPDATED] acme/widgets:"));
    assert!(lines[1].contains("https://github.com/acme/widgets/pull/1"));
}

#[tokio::test]
async fn test_pending_merge_reports_and_mutates_nothing() {
    // A later run with the automated PR still open.
    let mock = MockRepositoryClient {
        open_pulls: vec![github_client::PullRequest {
            number: 1,
            title: AUTOMATED_PR_TITLE.to_string(),
            html_url: None,
        }],
        ..Default::default()
    };
    let reporter = run_with(&mock, false).await;

    let lines = reporter.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[MERGE REQUIRED] acme/widgets:"));
    assert!(mock.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_dry_run_never_mutates_when_codeowners_missing() {
    let mock = MockRepositoryClient::default();
    let reporter = run_with(&mock, true).await;

    assert!(mock.mutating_calls().is_empty());
    let lines = reporter.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[UPDATE REQUIRED] acme/widgets:"));
}

#[tokio::test]
async fn test_dry_run_never_mutates_when_unmanaged_and_unprotected() {
    let mock = MockRepositoryClient {
        existing_paths: vec!["CODEOWNERS".to_string()],
        ..Default::default()
    };
    let reporter = run_with(&mock, true).await;

    assert!(mock.mutating_calls().is_empty());

    let lines = reporter.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("[OK] acme/widgets: CODEOWNERS"));
    assert!(lines[1].starts_with("[UPDATE REQUIRED] acme/widgets: needs to be managed by"));
    assert!(lines[2].starts_with("[UPDATE REQUIRED] acme/widgets: master requires branch protection"));
}

#[tokio::test]
async fn test_unmanaged_repository_is_granted_to_team_and_continues() {
    let mock = MockRepositoryClient {
        existing_paths: vec!["CODEOWNERS".to_string()],
        team_manages: false,
        require_code_owner_reviews: true,
        branch: Some(crate::test_support::test_branch(true)),
        ..Default::default()
    };
    let reporter = run_with(&mock, false).await;

    let mutating = mock.mutating_calls();
    assert_eq!(
        mutating,
        vec!["add_team_repository platform-team widgets admin".to_string()]
    );

    // Team management does not stop the run; the protection check still ran.
    let lines = reporter.lines();
    assert!(lines.iter().any(|line| line.contains("is now managed by")));
    assert!(lines.iter().any(|line| line.contains("master is already protected")));
}

#[tokio::test]
async fn test_unprotected_branch_is_protected_in_order() {
    let mock = MockRepositoryClient {
        existing_paths: vec![".github/CODEOWNERS".to_string()],
        team_manages: true,
        ..Default::default()
    };
    let reporter = run_with(&mock, false).await;

    let mutating = mock.mutating_calls();
    assert_eq!(mutating.len(), 2);
    assert_eq!(mutating[0], "set_branch_protection master");
    assert_eq!(
        mutating[1],
        "update_review_enforcement master code_owners=true"
    );

    let lines = reporter.lines();
    assert!(lines.last().unwrap().contains("master is now protected"));
}

#[tokio::test]
async fn test_protection_is_never_attempted_while_codeowners_outstanding() {
    // Even with an unprotected branch, an outstanding CODEOWNERS PR blocks
    // any protection work.
    let mock = MockRepositoryClient {
        open_pulls: vec![github_client::PullRequest {
            number: 9,
            title: AUTOMATED_PR_TITLE.to_string(),
            html_url: None,
        }],
        ..Default::default()
    };
    run_with(&mock, false).await;

    assert!(mock
        .calls()
        .iter()
        .all(|call| !call.contains("protection") && !call.contains("enforcement")));
}

#[tokio::test]
async fn test_branch_resolution_failure_aborts_the_run() {
    let mock = MockRepositoryClient {
        branch: None,
        ..Default::default()
    };
    let bot = PolicyBot::new(Arc::new(mock.clone()), &test_config())
        .await
        .unwrap();
    let reporter = RecordingReporter::default();

    let result = run(&bot, false, &reporter).await;
    assert!(matches!(result, Err(Error::GitHub(_))));
    assert!(reporter.lines().is_empty());
    assert!(mock.mutating_calls().is_empty());
}
