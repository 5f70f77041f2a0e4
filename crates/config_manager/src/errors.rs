//! Error types for configuration loading and validation.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while resolving the bot configuration.
///
/// All of these are fatal at startup; no repository is processed when the
/// configuration cannot be resolved.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file at the given path does not exist.
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// No GitHub token was provided via flag, environment, or file.
    #[error("A GitHub token is required but none was provided")]
    MissingToken,

    /// No organization was configured.
    #[error("At least one organization must be configured")]
    NoOrganizations,

    /// An organization entry does not name a maintainer team.
    #[error("Organization {org} does not name a maintainer team")]
    MissingMaintainer { org: String },
}
