//! Error types for the policy bot core.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can abort a reconciliation run.
///
/// There is no retry or partial-failure continuation: every variant is fatal
/// for the run as a whole.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GitHub API operation failed.
    #[error("GitHub operation failed: {0}")]
    GitHub(#[from] github_client::Error),

    /// The configured maintainer team does not exist in the organization.
    ///
    /// Raised during resolution, before any repository is processed.
    #[error("Team ({team}) not found within org ({org})")]
    TeamNotFound { team: String, org: String },
}
