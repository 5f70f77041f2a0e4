//! Core logic of the shepherd policy bot.
//!
//! This crate audits GitHub organization repositories against a small policy
//! (CODEOWNERS file present, maintainer team manages the repository, branch
//! protection requires code-owner review) and remediates drift. It holds an
//! authenticated client handle behind the [`github_client::RepositoryClient`]
//! trait and a resolved set of (repository, policy) pairs.
//!
//! The reconciliation driver in [`driver`] executes the checks in a fixed
//! order with short-circuit exits; see [`driver::run`]. Execution is fully
//! sequential: one repository is processed to completion before the next
//! begins, and the first unrecoverable error aborts the entire run.

pub mod errors;
pub use errors::Error;

pub mod policy;
pub use policy::{CodeownersState, RepoPolicy, AUTOMATED_PR_TITLE};

pub mod bot;
pub use bot::PolicyBot;

pub mod driver;
pub use driver::{run, ConsoleReporter, StatusReporter};

#[cfg(test)]
pub(crate) mod test_support;
