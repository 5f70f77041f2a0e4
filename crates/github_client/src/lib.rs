//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides a client for making authenticated requests to GitHub
//! using a personal access token, exposing only the operations the policy bot
//! consumes: organization/team/repository lookups, branch protection, file
//! content probes, and pull-request management. A base URL override supports
//! GitHub Enterprise Server deployments.

use async_trait::async_trait;
use base64::Engine as _;
use http::StatusCode;
use octocrab::{Octocrab, Result as OctocrabResult};
use tracing::{debug, error, info, instrument};

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{
    Account, Branch, BranchProtectionRequest, CommitRef, Existence, NewPullRequest, Organization,
    PullRequest, Repository, RequiredStatusChecks, ReviewEnforcement, ReviewEnforcementUpdate,
    Team,
};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Page size used when draining paginated list endpoints.
const PER_PAGE: usize = 100;

/// Fixed API path appended to a custom base URL (GitHub Enterprise Server).
const API_PATH_SUFFIX: &str = "/api/v3/";

/// Operations against a repository-hosting service that the policy bot needs.
///
/// Implemented by [`GitHubClient`] for the real API; tests supply mock
/// implementations so the reconciliation logic can be exercised without a
/// network. All listing operations drain every page before returning.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Fetches an organization by login name.
    async fn get_organization(&self, org: &str) -> Result<Organization, Error>;

    /// Lists all teams in an organization, across all pages.
    async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>, Error>;

    /// Lists all repositories in an organization, across all pages.
    async fn list_org_repositories(&self, org: &str) -> Result<Vec<Repository>, Error>;

    /// Probes whether a team has an explicit association with a repository.
    ///
    /// A 404 means "not managed" and is reported as [`Existence::Absent`],
    /// not as an error.
    async fn get_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Existence<()>, Error>;

    /// Adds a team to a repository with the given permission level.
    ///
    /// No read-back verification is performed; success of the call is taken
    /// at face value.
    async fn add_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<(), Error>;

    /// Fetches a branch, including its protection flag and tip commit SHA.
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error>;

    /// Creates or replaces the branch protection rule for a branch.
    async fn set_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<(), Error>;

    /// Fetches the pull-request review enforcement settings of a protected branch.
    async fn get_review_enforcement(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<ReviewEnforcement, Error>;

    /// Updates the pull-request review enforcement settings of a protected branch.
    async fn update_review_enforcement(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        update: &ReviewEnforcementUpdate,
    ) -> Result<ReviewEnforcement, Error>;

    /// Probes for a file at a path and ref.
    ///
    /// A 404 means the file does not exist at that path and is reported as
    /// [`Existence::Absent`], not as an error.
    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Existence<()>, Error>;

    /// Commits a single new file to a branch.
    async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
        message: &str,
        content: &str,
    ) -> Result<(), Error>;

    /// Lists the open pull requests of a repository.
    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, Error>;

    /// Opens a pull request.
    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        payload: &NewPullRequest,
    ) -> Result<PullRequest, Error>;

    /// Creates a branch pointing at an existing commit SHA.
    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), Error>;
}

/// A client for interacting with the GitHub API, authenticated with a token.
#[derive(Debug)]
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` wrapping an already-built `Octocrab`
    /// instance. Use [`create_token_client`] to construct one.
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Issues a raw GET and folds the response status into an [`Existence`]
    /// probe result: success is `Found`, 404 is `Absent`, anything else is an
    /// error.
    async fn probe(&self, path: String, operation: &'static str) -> Result<Existence<()>, Error> {
        debug!(path = %path, "Probing for resource existence");
        let response = self.client._get(path).await.map_err(|e| {
            log_octocrab_error("Existence probe failed to complete", e);
            Error::ApiError { operation }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Existence::Absent),
            status if status.is_success() => Ok(Existence::Found(())),
            status => {
                error!(
                    operation = operation,
                    status = status.as_u16(),
                    "Existence probe returned an unexpected status"
                );
                Err(Error::UnexpectedStatus {
                    operation,
                    status: status.as_u16(),
                })
            }
        }
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    #[instrument(skip(self), fields(org = %org))]
    async fn get_organization(&self, org: &str) -> Result<Organization, Error> {
        let path = format!("/orgs/{}", org);
        let result: OctocrabResult<Organization> = self.client.get(&path, None::<&()>).await;
        match result {
            Ok(organization) => Ok(organization),
            Err(e) => {
                log_octocrab_error("Failed to get organization", e);
                Err(Error::ApiError {
                    operation: "get organization",
                })
            }
        }
    }

    #[instrument(skip(self), fields(org = %org))]
    async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>, Error> {
        let mut teams = Vec::new();
        let mut page = 1u32;
        loop {
            let path = format!("/orgs/{}/teams?per_page={}&page={}", org, PER_PAGE, page);
            let batch: Vec<Team> = self.client.get(&path, None::<&()>).await.map_err(|e| {
                log_octocrab_error("Failed to list organization teams", e);
                Error::ApiError {
                    operation: "list organization teams",
                }
            })?;

            let drained = batch.len() < PER_PAGE;
            teams.extend(batch);
            if drained {
                break;
            }
            page += 1;
        }

        info!(org = org, count = teams.len(), "Retrieved organization teams");
        Ok(teams)
    }

    #[instrument(skip(self), fields(org = %org))]
    async fn list_org_repositories(&self, org: &str) -> Result<Vec<Repository>, Error> {
        let mut repositories = Vec::new();
        let mut page = 1u32;
        loop {
            let path = format!("/orgs/{}/repos?per_page={}&page={}", org, PER_PAGE, page);
            let batch: Vec<Repository> = self.client.get(&path, None::<&()>).await.map_err(|e| {
                log_octocrab_error("Failed to list organization repositories", e);
                Error::ApiError {
                    operation: "list organization repositories",
                }
            })?;

            let drained = batch.len() < PER_PAGE;
            repositories.extend(batch);
            if drained {
                break;
            }
            page += 1;
        }

        info!(
            org = org,
            count = repositories.len(),
            "Retrieved organization repositories"
        );
        Ok(repositories)
    }

    async fn get_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Existence<()>, Error> {
        let path = format!("/orgs/{}/teams/{}/repos/{}/{}", org, team_slug, owner, repo);
        self.probe(path, "get team repository").await
    }

    #[instrument(skip(self), fields(org = %org, team = %team_slug, repo = %repo))]
    async fn add_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<(), Error> {
        let path = format!("/orgs/{}/teams/{}/repos/{}/{}", org, team_slug, owner, repo);
        let body = serde_json::json!({ "permission": permission });

        // The endpoint answers 204 with an empty body, so the raw variant is
        // used instead of the deserializing one.
        let response = self.client._put(path, Some(&body)).await.map_err(|e| {
            log_octocrab_error("Failed to add team to repository", e);
            Error::ApiError {
                operation: "add team to repository",
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                status = status.as_u16(),
                "Adding team to repository was rejected"
            );
            return Err(Error::UnexpectedStatus {
                operation: "add team to repository",
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error> {
        let path = format!("/repos/{}/{}/branches/{}", owner, repo, branch);
        let result: OctocrabResult<Branch> = self.client.get(&path, None::<&()>).await;
        match result {
            Ok(b) => Ok(b),
            Err(e) => {
                log_octocrab_error("Failed to get branch", e);
                Err(Error::ApiError {
                    operation: "get branch",
                })
            }
        }
    }

    #[instrument(skip(self, request), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn set_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<(), Error> {
        let path = format!("/repos/{}/{}/branches/{}/protection", owner, repo, branch);
        let response: OctocrabResult<serde_json::Value> =
            self.client.put(&path, Some(request)).await;
        match response {
            Ok(_) => {
                info!(branch = branch, "Branch protection rule applied");
                Ok(())
            }
            Err(e) => {
                log_octocrab_error("Failed to set branch protection", e);
                Err(Error::ApiError {
                    operation: "set branch protection",
                })
            }
        }
    }

    async fn get_review_enforcement(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<ReviewEnforcement, Error> {
        let path = format!(
            "/repos/{}/{}/branches/{}/protection/required_pull_request_reviews",
            owner, repo, branch
        );
        let result: OctocrabResult<ReviewEnforcement> = self.client.get(&path, None::<&()>).await;
        match result {
            Ok(enforcement) => Ok(enforcement),
            Err(e) => {
                log_octocrab_error("Failed to get review enforcement", e);
                Err(Error::ApiError {
                    operation: "get review enforcement",
                })
            }
        }
    }

    #[instrument(skip(self, update), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn update_review_enforcement(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        update: &ReviewEnforcementUpdate,
    ) -> Result<ReviewEnforcement, Error> {
        let path = format!(
            "/repos/{}/{}/branches/{}/protection/required_pull_request_reviews",
            owner, repo, branch
        );
        let result: OctocrabResult<ReviewEnforcement> = self.client.patch(&path, Some(update)).await;
        match result {
            Ok(enforcement) => {
                info!(branch = branch, "Review enforcement updated");
                Ok(enforcement)
            }
            Err(e) => {
                log_octocrab_error("Failed to update review enforcement", e);
                Err(Error::ApiError {
                    operation: "update review enforcement",
                })
            }
        }
    }

    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Existence<()>, Error> {
        let route = format!(
            "/repos/{}/{}/contents/{}?ref={}",
            owner, repo, path, reference
        );
        self.probe(route, "get file contents").await
    }

    #[instrument(skip(self, content), fields(owner = %owner, repo = %repo, path = %path, branch = %branch))]
    async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
        message: &str,
        content: &str,
    ) -> Result<(), Error> {
        let route = format!("/repos/{}/{}/contents/{}", owner, repo, path);
        let body = serde_json::json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "branch": branch,
        });

        let response: OctocrabResult<serde_json::Value> = self.client.put(&route, Some(&body)).await;
        match response {
            Ok(_) => {
                info!(path = path, branch = branch, "File committed to branch");
                Ok(())
            }
            Err(e) => {
                log_octocrab_error("Failed to create file", e);
                Err(Error::ApiError {
                    operation: "create file",
                })
            }
        }
    }

    async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, Error> {
        let mut pulls = Vec::new();
        let mut page = 1u32;
        loop {
            let path = format!(
                "/repos/{}/{}/pulls?state=open&per_page={}&page={}",
                owner, repo, PER_PAGE, page
            );
            let batch: Vec<PullRequest> = self.client.get(&path, None::<&()>).await.map_err(|e| {
                log_octocrab_error("Failed to list pull requests", e);
                Error::ApiError {
                    operation: "list pull requests",
                }
            })?;

            let drained = batch.len() < PER_PAGE;
            pulls.extend(batch);
            if drained {
                break;
            }
            page += 1;
        }
        Ok(pulls)
    }

    #[instrument(skip(self, payload), fields(owner = %owner, repo = %repo))]
    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        payload: &NewPullRequest,
    ) -> Result<PullRequest, Error> {
        let path = format!("/repos/{}/{}/pulls", owner, repo);
        let result: OctocrabResult<PullRequest> = self.client.post(&path, Some(payload)).await;
        match result {
            Ok(pr) => {
                info!(number = pr.number, "Pull request created");
                Ok(pr)
            }
            Err(e) => {
                log_octocrab_error("Failed to create pull request", e);
                Err(Error::ApiError {
                    operation: "create pull request",
                })
            }
        }
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), Error> {
        let path = format!("/repos/{}/{}/git/refs", owner, repo);
        let body = serde_json::json!({
            "ref": format!("refs/heads/{}", branch),
            "sha": sha,
        });

        let result: OctocrabResult<serde_json::Value> = self.client.post(&path, Some(&body)).await;
        match result {
            Ok(_) => {
                info!(branch = branch, sha = sha, "Branch created");
                Ok(())
            }
            Err(e) => {
                log_octocrab_error("Failed to create branch", e);
                Err(Error::ApiError {
                    operation: "create branch",
                })
            }
        }
    }
}

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// When `base_url` is provided (GitHub Enterprise Server), the fixed
/// `/api/v3/` suffix is appended to it, mirroring the convention of GHES
/// deployments; otherwise the client talks to github.com.
///
/// # Errors
/// Returns an `Error::AuthError` if the base URL cannot be parsed or the
/// client cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_url: Option<&str>) -> Result<Octocrab, Error> {
    let builder = Octocrab::builder().personal_token(token.to_string());

    let builder = match base_url {
        Some(base) => {
            let uri = format!("{}{}", base.trim_end_matches('/'), API_PATH_SUFFIX);
            info!(base_uri = %uri, "Using custom GitHub base URL");
            builder.base_uri(uri).map_err(|e| {
                Error::AuthError(format!("Failed to parse the base URL. Error was: {}", e))
            })?
        }
        None => builder,
    };

    builder.build().map_err(|e| {
        error!(error = ?e, "Failed to build Octocrab client");
        Error::AuthError("Failed to build a client for the provided token.".to_string())
    })
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = source;
            error!(
                error_message = err.message,
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
