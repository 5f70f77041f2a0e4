//! Policy types: what a compliant repository looks like and the transient
//! outcome of a compliance check.

use std::collections::BTreeMap;

use config_manager::LabelConfig;
use github_client::{PullRequest, Team};

/// Candidate locations for a CODEOWNERS file, in probe order.
pub const CODEOWNERS_CANDIDATE_PATHS: [&str; 3] =
    ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

/// Title used for the automated CODEOWNERS pull request. The exact string
/// also identifies an in-flight remediation on later runs.
pub const AUTOMATED_PR_TITLE: &str = "[AUTOMATED] Adding CODEOWNERS file";

/// Commit message for the CODEOWNERS commit.
pub const CODEOWNERS_COMMIT_MESSAGE: &str = "Adding CODEOWNERS file";

/// Path at which the remediation commits the CODEOWNERS file.
pub const CODEOWNERS_FILE_PATH: &str = ".github/CODEOWNERS";

/// Prefix of the remediation branch; a random suffix is appended for
/// collision avoidance.
pub const REMEDIATION_BRANCH_PREFIX: &str = "add-codeowners-shepherd-";

/// Permission level granted to the maintainer team.
pub const MAINTAINER_PERMISSION: &str = "admin";

/// The policy a repository is audited against.
///
/// Created once during resolution, before any check runs, and never mutated.
#[derive(Debug, Clone)]
pub struct RepoPolicy {
    /// Configured name of the maintainer team, as written by the operator
    pub maintainer: String,
    /// The resolved maintainer team
    pub team: Team,
    /// The branch that must carry protection rules
    pub protected_branch: String,
    /// Labels the organization wants on the repository (stored only)
    pub labels: Vec<LabelConfig>,
    /// Issue/PR template paths (stored only)
    pub templates: BTreeMap<String, String>,
}

/// Outcome of the CODEOWNERS compliance check.
///
/// Never persisted; recomputed on every run.
#[derive(Debug, Clone)]
pub enum CodeownersState {
    /// A CODEOWNERS file exists at one of the candidate paths.
    Satisfied,
    /// No CODEOWNERS file and no automated pull request in flight.
    NeedsRemediation,
    /// An earlier run already opened the automated pull request; it has to be
    /// merged by a human before the repository can progress.
    PendingMerge(PullRequest),
}

impl CodeownersState {
    /// Returns `true` when the CODEOWNERS requirement is met.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, CodeownersState::Satisfied)
    }
}
