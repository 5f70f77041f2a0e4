//! Shared test doubles for the bot and driver tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use github_client::{
    Account, Branch, BranchProtectionRequest, CommitRef, Error as GitHubError, Existence,
    NewPullRequest, Organization, PullRequest, Repository, RepositoryClient, ReviewEnforcement,
    ReviewEnforcementUpdate, Team,
};

use crate::driver::StatusReporter;

/// Call names considered mutating for the dry-run assertions.
const MUTATING_CALLS: [&str; 6] = [
    "create_branch",
    "create_file",
    "create_pull_request",
    "add_team_repository",
    "set_branch_protection",
    "update_review_enforcement",
];

/// A scripted `RepositoryClient` that records every call it receives.
///
/// Cloning shares the call log, so tests keep a handle for assertions and
/// hand a clone to the bot.
#[derive(Clone)]
pub(crate) struct MockRepositoryClient {
    pub organization: Organization,
    pub teams: Vec<Team>,
    pub repositories: Vec<Repository>,
    pub branch: Option<Branch>,
    /// CODEOWNERS candidate paths that exist in the repository
    pub existing_paths: Vec<String>,
    pub open_pulls: Vec<PullRequest>,
    pub team_manages: bool,
    pub require_code_owner_reviews: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockRepositoryClient {
    fn default() -> Self {
        Self {
            organization: Organization {
                login: "acme".to_string(),
            },
            teams: vec![test_team()],
            repositories: vec![test_repository()],
            branch: Some(test_branch(false)),
            existing_paths: Vec::new(),
            open_pulls: Vec::new(),
            team_manages: false,
            require_code_owner_reviews: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockRepositoryClient {
    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| {
                MUTATING_CALLS
                    .iter()
                    .any(|mutating| call.starts_with(mutating))
            })
            .collect()
    }
}

#[async_trait]
impl RepositoryClient for MockRepositoryClient {
    async fn get_organization(&self, org: &str) -> Result<Organization, GitHubError> {
        self.log(format!("get_organization {org}"));
        Ok(self.organization.clone())
    }

    async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>, GitHubError> {
        self.log(format!("list_org_teams {org}"));
        Ok(self.teams.clone())
    }

    async fn list_org_repositories(&self, org: &str) -> Result<Vec<Repository>, GitHubError> {
        self.log(format!("list_org_repositories {org}"));
        Ok(self.repositories.clone())
    }

    async fn get_team_repository(
        &self,
        _org: &str,
        team_slug: &str,
        _owner: &str,
        repo: &str,
    ) -> Result<Existence<()>, GitHubError> {
        self.log(format!("get_team_repository {team_slug} {repo}"));
        Ok(if self.team_manages {
            Existence::Found(())
        } else {
            Existence::Absent
        })
    }

    async fn add_team_repository(
        &self,
        _org: &str,
        team_slug: &str,
        _owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<(), GitHubError> {
        self.log(format!("add_team_repository {team_slug} {repo} {permission}"));
        Ok(())
    }

    async fn get_branch(&self, _owner: &str, _repo: &str, branch: &str) -> Result<Branch, GitHubError> {
        self.log(format!("get_branch {branch}"));
        self.branch.clone().ok_or(GitHubError::ApiError {
            operation: "get branch",
        })
    }

    async fn set_branch_protection(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
        _request: &BranchProtectionRequest,
    ) -> Result<(), GitHubError> {
        self.log(format!("set_branch_protection {branch}"));
        Ok(())
    }

    async fn get_review_enforcement(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
    ) -> Result<ReviewEnforcement, GitHubError> {
        self.log(format!("get_review_enforcement {branch}"));
        Ok(ReviewEnforcement {
            require_code_owner_reviews: self.require_code_owner_reviews,
            dismiss_stale_reviews: false,
        })
    }

    async fn update_review_enforcement(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
        update: &ReviewEnforcementUpdate,
    ) -> Result<ReviewEnforcement, GitHubError> {
        self.log(format!(
            "update_review_enforcement {branch} code_owners={}",
            update.require_code_owner_reviews
        ));
        Ok(ReviewEnforcement {
            require_code_owner_reviews: update.require_code_owner_reviews,
            dismiss_stale_reviews: update.dismiss_stale_reviews.unwrap_or(false),
        })
    }

    async fn get_content(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        _reference: &str,
    ) -> Result<Existence<()>, GitHubError> {
        self.log(format!("get_content {path}"));
        Ok(if self.existing_paths.iter().any(|p| p == path) {
            Existence::Found(())
        } else {
            Existence::Absent
        })
    }

    async fn create_file(
        &self,
        _owner: &str,
        _repo: &str,
        path: &str,
        branch: &str,
        message: &str,
        content: &str,
    ) -> Result<(), GitHubError> {
        self.log(format!("create_file {path} branch={branch} message={message} content={content}"));
        Ok(())
    }

    async fn list_open_pull_requests(
        &self,
        _owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        self.log(format!("list_open_pull_requests {repo}"));
        Ok(self.open_pulls.clone())
    }

    async fn create_pull_request(
        &self,
        _owner: &str,
        _repo: &str,
        payload: &NewPullRequest,
    ) -> Result<PullRequest, GitHubError> {
        self.log(format!(
            "create_pull_request title={} head={} base={}",
            payload.title, payload.head, payload.base
        ));
        Ok(PullRequest {
            number: 1,
            title: payload.title.clone(),
            html_url: Some("https://github.com/acme/widgets/pull/1".to_string()),
        })
    }

    async fn create_branch(
        &self,
        _owner: &str,
        _repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), GitHubError> {
        self.log(format!("create_branch {branch} sha={sha}"));
        Ok(())
    }
}

/// Records status lines with their prefixes for ordering assertions.
#[derive(Clone, Default)]
pub(crate) struct RecordingReporter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

impl StatusReporter for RecordingReporter {
    fn ok(&self, repo: &str, message: &str) {
        self.push(format!("[OK] {}: {}", repo, message));
    }

    fn update_required(&self, repo: &str, message: &str) {
        self.push(format!("[UPDATE REQUIRED] {}: {}", repo, message));
    }

    fn updated(&self, repo: &str, message: &str) {
        self.push(format!("[UPDATED] {}: {}", repo, message));
    }

    fn merge_required(&self, repo: &str, message: &str) {
        self.push(format!("[MERGE REQUIRED] {}: {}", repo, message));
    }
}

pub(crate) fn test_team() -> Team {
    Team {
        id: 7,
        name: "Platform Team".to_string(),
        slug: "platform-team".to_string(),
    }
}

pub(crate) fn test_repository() -> Repository {
    Repository {
        name: "widgets".to_string(),
        full_name: "acme/widgets".to_string(),
        owner: Account {
            login: "acme".to_string(),
        },
    }
}

pub(crate) fn test_branch(protected: bool) -> Branch {
    Branch {
        name: "master".to_string(),
        commit: CommitRef {
            sha: "6dcb09b5b57875f334f61aebed695e2e4193db5e".to_string(),
        },
        protected,
    }
}

pub(crate) fn test_config() -> config_manager::Config {
    config_manager::Config {
        github_token: "ghp_testtoken".to_string(),
        base_url: None,
        dry_run: false,
        organizations: vec![config_manager::OrganizationConfig {
            org_name: "acme".to_string(),
            maintainer: "platform-team".to_string(),
            protected_branch: "master".to_string(),
            labels: Vec::new(),
            templates: Default::default(),
        }],
    }
}
