//! # Models
//!
//! Data models for the slice of the GitHub REST API that the policy bot
//! consumes: organizations, teams, repositories, branches, pull requests and
//! branch-protection settings. They are deliberately narrow; only the fields
//! the bot reads are deserialized.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Outcome of an existence probe against the GitHub API.
///
/// GitHub signals "this thing does not exist" with a 404, which for the probes
/// the bot performs (CODEOWNERS file lookup, team-repository association) is a
/// perfectly valid negative answer rather than a failure. Modelling it as a
/// tagged result keeps the remediation logic free of HTTP status inspection:
/// transport and API failures travel through `Err`, absence through
/// [`Existence::Absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence<T> {
    /// The resource exists.
    Found(T),
    /// The remote service reported the resource as not present.
    Absent,
}

impl<T> Existence<T> {
    /// Returns `true` if the probe found the resource.
    pub fn is_found(&self) -> bool {
        matches!(self, Existence::Found(_))
    }
}

/// Represents a GitHub organization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Organization {
    /// The login name of the organization
    pub login: String,
}

/// Represents a team within a GitHub organization.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Team {
    /// The unique ID of the team
    pub id: u64,
    /// The display name of the team
    pub name: String,
    /// The URL-safe slug of the team, used in mentions and API routes
    pub slug: String,
}

/// Represents the owner of a repository (user or organization).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    /// The login name of the account
    pub login: String,
}

/// Represents a GitHub repository as returned by the list/get endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Repository {
    /// The name of the repository (without owner)
    pub name: String,
    /// The full name of the repository (owner/name)
    pub full_name: String,
    /// The account that owns the repository
    pub owner: Account,
}

impl Repository {
    /// Returns the login of the owning account.
    pub fn owner_login(&self) -> &str {
        &self.owner.login
    }
}

/// The head commit of a branch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommitRef {
    /// The SHA of the commit
    pub sha: String,
}

/// Represents a repository branch.
///
/// Read fresh from the API whenever the bot needs it; never cached across
/// checks, so the protection flag reflects the state at probe time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Branch {
    /// The name of the branch
    pub name: String,
    /// The commit at the tip of the branch
    pub commit: CommitRef,
    /// Whether branch protection is enabled
    #[serde(default)]
    pub protected: bool,
}

/// Represents a pull request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRequest {
    /// The pull request number
    pub number: u64,
    /// The title of the pull request
    pub title: String,
    /// Browser URL of the pull request, when provided by the API
    pub html_url: Option<String>,
}

/// Pull-request review enforcement settings for a protected branch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReviewEnforcement {
    /// Whether an approving review from a code owner is required
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    /// Whether approving reviews are dismissed when new commits are pushed
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
}

/// Required status checks section of a branch protection rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    /// Whether branches must be up to date before merging
    pub strict: bool,
    /// Status check contexts that must pass
    pub contexts: Vec<String>,
}

/// Payload for `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
///
/// The endpoint requires every top-level key to be present, with `null` for
/// the sections that are not being configured, so the optional fields here are
/// serialized even when `None`.
#[derive(Debug, Clone, Serialize)]
pub struct BranchProtectionRequest {
    /// Required status checks, or `null` to disable
    pub required_status_checks: Option<RequiredStatusChecks>,
    /// Whether admins are subject to the protection rule
    pub enforce_admins: Option<bool>,
    /// Required review settings, or `null` to leave unconfigured
    pub required_pull_request_reviews: Option<ReviewEnforcementUpdate>,
    /// Push restrictions, or `null` for none
    pub restrictions: Option<serde_json::Value>,
}

impl BranchProtectionRequest {
    /// The baseline protection rule the bot applies: an empty, non-strict
    /// required-status-checks section and nothing else. Review enforcement is
    /// configured by a follow-up call.
    pub fn baseline() -> Self {
        Self {
            required_status_checks: Some(RequiredStatusChecks {
                strict: false,
                contexts: Vec::new(),
            }),
            enforce_admins: None,
            required_pull_request_reviews: None,
            restrictions: None,
        }
    }
}

/// Payload for updating pull-request review enforcement on a protected branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEnforcementUpdate {
    /// Require an approving review from a code owner
    pub require_code_owner_reviews: bool,
    /// Dismiss approving reviews when new commits are pushed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews: Option<bool>,
}

/// Payload for creating a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    /// Title of the pull request
    pub title: String,
    /// Name of the branch containing the changes
    pub head: String,
    /// Name of the branch to merge into
    pub base: String,
    /// Body text of the pull request
    pub body: String,
    /// Whether maintainers of the base repository can push to the head branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_can_modify: Option<bool>,
}
