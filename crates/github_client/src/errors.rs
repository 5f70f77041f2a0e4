//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// Transport failures and unexpected API responses are all surfaced through this
/// enum. A 404 on an existence probe is deliberately *not* an error; those calls
/// report absence through [`crate::models::Existence`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GitHub API request failed.
    ///
    /// The operation name identifies which call failed. The underlying octocrab
    /// error has already been logged with full detail when this is constructed.
    #[error("GitHub API request failed: {operation}")]
    ApiError { operation: &'static str },

    /// Authentication or GitHub client initialization failure.
    ///
    /// This occurs when the token is rejected during client construction or the
    /// configured base URL cannot be parsed.
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// The GitHub API answered an existence probe with a status that is neither
    /// success nor 404.
    #[error("GitHub returned unexpected status {status} for {operation}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },
}
