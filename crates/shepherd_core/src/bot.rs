//! The policy bot: repository resolution and the three compliance
//! checks/remediations.
//!
//! The bot holds the authenticated client behind the
//! [`RepositoryClient`] trait and the resolved `(repository, policy)` pairs.
//! Checks never cache remote state; every run observes the service fresh.

use std::sync::Arc;

use github_client::{
    Branch, BranchProtectionRequest, Existence, NewPullRequest, PullRequest, Repository,
    RepositoryClient, ReviewEnforcementUpdate, Team,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::errors::Error;
use crate::policy::{
    CodeownersState, RepoPolicy, AUTOMATED_PR_TITLE, CODEOWNERS_CANDIDATE_PATHS,
    CODEOWNERS_COMMIT_MESSAGE, CODEOWNERS_FILE_PATH, MAINTAINER_PERMISSION,
    REMEDIATION_BRANCH_PREFIX,
};

#[cfg(test)]
#[path = "bot_tests.rs"]
mod tests;

/// Audits and remediates repositories against their resolved policy.
pub struct PolicyBot {
    client: Arc<dyn RepositoryClient>,
    repos: Vec<(Repository, RepoPolicy)>,
}

impl PolicyBot {
    /// Builds a bot by resolving every configured organization.
    ///
    /// For each organization this fetches the organization, pages through its
    /// teams to resolve the maintainer team (case-insensitive match on name
    /// or slug), and pages through its repositories. Each repository is
    /// paired with an immutable [`RepoPolicy`] before any check runs.
    ///
    /// # Errors
    ///
    /// Fails when an organization cannot be fetched, a listing call fails, or
    /// a maintainer team is not present in its organization
    /// ([`Error::TeamNotFound`]). All of these are fatal before any
    /// repository is processed.
    #[instrument(skip(client, config))]
    pub async fn new(
        client: Arc<dyn RepositoryClient>,
        config: &config_manager::Config,
    ) -> Result<Self, Error> {
        let mut repos = Vec::new();

        for org_config in &config.organizations {
            let organization = client.get_organization(&org_config.org_name).await?;
            let team = resolve_maintainer_team(
                client.as_ref(),
                &organization.login,
                &org_config.maintainer,
            )
            .await?;

            let repositories = client.list_org_repositories(&organization.login).await?;
            info!(
                org = %organization.login,
                team = %team.slug,
                repository_count = repositories.len(),
                "Resolved organization"
            );

            for repository in repositories {
                repos.push((
                    repository,
                    RepoPolicy {
                        maintainer: org_config.maintainer.clone(),
                        team: team.clone(),
                        protected_branch: org_config.protected_branch.clone(),
                        labels: org_config.labels.clone(),
                        templates: org_config.templates.clone(),
                    },
                ));
            }
        }

        Ok(Self { client, repos })
    }

    /// The resolved repositories and their policies, in resolution order.
    pub fn repositories(&self) -> &[(Repository, RepoPolicy)] {
        &self.repos
    }

    /// Fetches a branch of a repository fresh from the service.
    pub async fn get_branch(
        &self,
        repository: &Repository,
        branch_name: &str,
    ) -> Result<Branch, Error> {
        let branch = self
            .client
            .get_branch(repository.owner_login(), &repository.name, branch_name)
            .await?;
        Ok(branch)
    }

    /// Checks CODEOWNERS compliance for a repository at a branch tip.
    ///
    /// Probes the candidate paths in order; a hit at any path satisfies the
    /// check. A 404 means "try the next path" and is not an error. When no
    /// path hits, an open pull request whose title is exactly
    /// [`AUTOMATED_PR_TITLE`] marks the remediation as already in flight.
    pub async fn check_codeowners(
        &self,
        repository: &Repository,
        branch: &Branch,
    ) -> Result<CodeownersState, Error> {
        let reference = format!("refs/heads/{}", branch.name);

        for path in CODEOWNERS_CANDIDATE_PATHS {
            let probe = self
                .client
                .get_content(repository.owner_login(), &repository.name, path, &reference)
                .await?;
            match probe {
                Existence::Found(()) => {
                    debug!(repo = %repository.full_name, path = path, "CODEOWNERS file found");
                    return Ok(CodeownersState::Satisfied);
                }
                Existence::Absent => continue,
            }
        }

        let pulls = self
            .client
            .list_open_pull_requests(repository.owner_login(), &repository.name)
            .await?;
        if let Some(pr) = pulls.into_iter().find(|pr| pr.title == AUTOMATED_PR_TITLE) {
            return Ok(CodeownersState::PendingMerge(pr));
        }

        Ok(CodeownersState::NeedsRemediation)
    }

    /// Remediates a missing CODEOWNERS file.
    ///
    /// Creates a branch with a random suffix at the tip commit, commits a
    /// CODEOWNERS file granting the maintainer team ownership of the whole
    /// tree, and opens the automated pull request against the audited branch.
    ///
    /// There is no rollback: if a later step fails, earlier state (for
    /// example a created branch without a pull request) is left for the
    /// operator to clean up.
    #[instrument(skip(self, branch, policy), fields(repo = %repository.full_name))]
    pub async fn create_codeowners_pr(
        &self,
        repository: &Repository,
        branch: &Branch,
        policy: &RepoPolicy,
    ) -> Result<PullRequest, Error> {
        let owner = repository.owner_login();
        let suffix = Uuid::new_v4().simple().to_string();
        let branch_name = format!("{}{}", REMEDIATION_BRANCH_PREFIX, &suffix[..8]);

        self.client
            .create_branch(owner, &repository.name, &branch_name, &branch.commit.sha)
            .await?;

        let content = format!("* @{}/{}", owner, policy.team.slug);
        self.client
            .create_file(
                owner,
                &repository.name,
                CODEOWNERS_FILE_PATH,
                &branch_name,
                CODEOWNERS_COMMIT_MESSAGE,
                &content,
            )
            .await?;

        let payload = NewPullRequest {
            title: AUTOMATED_PR_TITLE.to_string(),
            head: branch_name,
            base: branch.name.clone(),
            body: codeowners_pr_body(owner, &policy.team.slug),
            maintainer_can_modify: Some(true),
        };
        let pr = self
            .client
            .create_pull_request(owner, &repository.name, &payload)
            .await?;

        info!(repo = %repository.full_name, number = pr.number, "Opened CODEOWNERS pull request");
        Ok(pr)
    }

    /// Checks whether the maintainer team has an explicit association with
    /// the repository. Absence is a valid negative answer, not an error.
    pub async fn check_team_management(
        &self,
        repository: &Repository,
        policy: &RepoPolicy,
    ) -> Result<bool, Error> {
        let probe = self
            .client
            .get_team_repository(
                repository.owner_login(),
                &policy.team.slug,
                repository.owner_login(),
                &repository.name,
            )
            .await?;
        Ok(probe.is_found())
    }

    /// Grants the maintainer team admin permission on the repository.
    ///
    /// Success is assumed if the call does not error; no read-back.
    pub async fn manage_repository(
        &self,
        repository: &Repository,
        policy: &RepoPolicy,
    ) -> Result<(), Error> {
        self.client
            .add_team_repository(
                repository.owner_login(),
                &policy.team.slug,
                repository.owner_login(),
                &repository.name,
                MAINTAINER_PERMISSION,
            )
            .await?;
        Ok(())
    }

    /// Checks whether the branch is protected with code-owner review
    /// required.
    ///
    /// If the branch's protection flag is off this returns `false` without
    /// any further remote call.
    pub async fn check_branch_protection(
        &self,
        repository: &Repository,
        branch: &Branch,
    ) -> Result<bool, Error> {
        if !branch.protected {
            return Ok(false);
        }

        let enforcement = self
            .client
            .get_review_enforcement(repository.owner_login(), &repository.name, &branch.name)
            .await?;
        Ok(enforcement.require_code_owner_reviews)
    }

    /// Enables branch protection and code-owner review enforcement.
    ///
    /// Two sequential calls: the protection rule first (empty, non-strict
    /// status checks), then the review enforcement update. The second call is
    /// only attempted when the first succeeds.
    #[instrument(skip(self, branch), fields(repo = %repository.full_name, branch = %branch.name))]
    pub async fn protect_branch(
        &self,
        repository: &Repository,
        branch: &Branch,
    ) -> Result<(), Error> {
        self.client
            .set_branch_protection(
                repository.owner_login(),
                &repository.name,
                &branch.name,
                &BranchProtectionRequest::baseline(),
            )
            .await?;

        self.client
            .update_review_enforcement(
                repository.owner_login(),
                &repository.name,
                &branch.name,
                &ReviewEnforcementUpdate {
                    require_code_owner_reviews: true,
                    dismiss_stale_reviews: Some(true),
                },
            )
            .await?;

        Ok(())
    }
}

/// Resolves the maintainer team by case-insensitive match on team name or
/// slug over the organization's full team list.
async fn resolve_maintainer_team(
    client: &dyn RepositoryClient,
    org: &str,
    maintainer: &str,
) -> Result<Team, Error> {
    let teams = client.list_org_teams(org).await?;
    teams
        .into_iter()
        .find(|team| {
            maintainer.eq_ignore_ascii_case(&team.name) || maintainer.eq_ignore_ascii_case(&team.slug)
        })
        .ok_or_else(|| Error::TeamNotFound {
            team: maintainer.to_string(),
            org: org.to_string(),
        })
}

fn codeowners_pr_body(org: &str, team_slug: &str) -> String {
    format!(
        "Hi there @{org}/{team_slug}!\n\n\
         This repository is missing a CODEOWNERS file, which is mandated for \
         repositories within this organization so that the maintainers are \
         requested to review pull requests as they come in.\n\n\
         This PR was created automatically by the shepherd bot.\n\n\
         Thanks,\nshepherd"
    )
}
