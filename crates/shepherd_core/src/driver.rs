//! Reconciliation driver: runs the compliance checks for every resolved
//! repository in a fixed order with short-circuit exits.
//!
//! Ordering is load-bearing. Branch protection that requires code-owner
//! review is meaningless without a CODEOWNERS file, so protection is never
//! attempted while CODEOWNERS is outstanding, and a fresh CODEOWNERS pull
//! request stops processing of that repository until a human merges it.

use tracing::instrument;

use crate::bot::PolicyBot;
use crate::errors::Error;
use crate::policy::{CodeownersState, RepoPolicy};
use github_client::Repository;

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;

/// Sink for the per-repository status lines.
///
/// The binary wires this to stdout; tests record the lines to assert on
/// ordering and dry-run behavior.
pub trait StatusReporter: Send + Sync {
    /// The repository already satisfies a policy item.
    fn ok(&self, repo: &str, message: &str);
    /// The repository violates a policy item.
    fn update_required(&self, repo: &str, message: &str);
    /// A remediation was performed.
    fn updated(&self, repo: &str, message: &str);
    /// A remediation is in flight and awaits a human merge.
    fn merge_required(&self, repo: &str, message: &str);
}

/// Prints status lines to stdout, one line per event.
///
/// These lines are the program's output contract, not diagnostics, so they
/// go through `println!` rather than `tracing`.
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn ok(&self, repo: &str, message: &str) {
        println!("[OK] {}: {}", repo, message);
    }

    fn update_required(&self, repo: &str, message: &str) {
        println!("[UPDATE REQUIRED] {}: {}", repo, message);
    }

    fn updated(&self, repo: &str, message: &str) {
        println!("[UPDATED] {}: {}", repo, message);
    }

    fn merge_required(&self, repo: &str, message: &str) {
        println!("[MERGE REQUIRED] {}: {}", repo, message);
    }
}

/// Reconciles every resolved repository, sequentially and fail-fast.
///
/// Each repository is processed to completion before the next begins. The
/// first error aborts the whole run; there is no retry and no
/// partial-failure continuation.
pub async fn run(
    bot: &PolicyBot,
    dry_run: bool,
    reporter: &dyn StatusReporter,
) -> Result<(), Error> {
    for (repository, policy) in bot.repositories() {
        reconcile_repository(bot, repository, policy, dry_run, reporter).await?;
    }
    Ok(())
}

/// The per-repository state machine (check, then optionally fix).
#[instrument(skip(bot, repository, policy, reporter), fields(repo = %repository.full_name))]
async fn reconcile_repository(
    bot: &PolicyBot,
    repository: &Repository,
    policy: &RepoPolicy,
    dry_run: bool,
    reporter: &dyn StatusReporter,
) -> Result<(), Error> {
    let branch = bot.get_branch(repository, &policy.protected_branch).await?;

    match bot.check_codeowners(repository, &branch).await? {
        CodeownersState::NeedsRemediation => {
            reporter.update_required(
                &repository.full_name,
                "a CODEOWNERS file was not found, a PR should be created",
            );

            if !dry_run {
                let pr = bot.create_codeowners_pr(repository, &branch, policy).await?;
                let url = pr
                    .html_url
                    .clone()
                    .unwrap_or_else(|| format!("#{}", pr.number));
                reporter.updated(
                    &repository.full_name,
                    &format!("a PR ({}) has been created to add a CODEOWNERS file", url),
                );
            }

            // The PR has to be merged before anything further can be done.
            return Ok(());
        }
        CodeownersState::PendingMerge(_) => {
            reporter.merge_required(
                &repository.full_name,
                "CODEOWNERS file exists in a PR, please merge this before continuing",
            );
            return Ok(());
        }
        CodeownersState::Satisfied => {
            reporter.ok(&repository.full_name, "CODEOWNERS file already exists in repo");
        }
    }

    // The team has to be assigned to the repo explicitly, even within its own
    // org, to count as the maintainer.
    if bot.check_team_management(repository, policy).await? {
        reporter.ok(
            &repository.full_name,
            &format!("is already managed by {}", policy.maintainer),
        );
    } else {
        reporter.update_required(
            &repository.full_name,
            &format!("needs to be managed by {}", policy.maintainer),
        );

        if !dry_run {
            bot.manage_repository(repository, policy).await?;
            reporter.ok(
                &repository.full_name,
                &format!("is now managed by {}", policy.maintainer),
            );
        }
    }

    if bot.check_branch_protection(repository, &branch).await? {
        reporter.ok(
            &repository.full_name,
            &format!("{} is already protected", branch.name),
        );
        return Ok(());
    }

    reporter.update_required(
        &repository.full_name,
        &format!("{} requires branch protection", branch.name),
    );

    if !dry_run {
        bot.protect_branch(repository, &branch).await?;
        reporter.ok(
            &repository.full_name,
            &format!("{} is now protected", branch.name),
        );
    }

    Ok(())
}
