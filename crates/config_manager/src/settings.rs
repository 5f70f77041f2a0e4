//! Configuration model and resolution for the policy bot.
//!
//! The bot grew two configuration front-ends over time: a flag-based one for
//! auditing a single organization, and a TOML file for fleets of
//! organizations. Both shapes funnel through [`Config::resolve`], which loads
//! the file (when present), layers CLI overrides on top, falls back to the
//! environment for the token, and validates the result. The resolved value is
//! constructed once at startup and passed down by reference; there is no
//! ambient global configuration.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = ".shepherd.toml";

/// Branch audited when an organization does not configure one.
pub const DEFAULT_PROTECTED_BRANCH: &str = "master";

/// Environment variables consulted for the token, in precedence order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["SHEPHERD_GITHUB_TOKEN", "GITHUB_TOKEN"];

/// A repository label an organization wants present.
///
/// Parsed and carried on the policy for configuration parity; no label
/// remediation is performed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LabelConfig {
    /// The name of the label
    pub name: String,
    /// The label color, as a hex string without the leading `#`
    #[serde(default)]
    pub color: String,
}

/// Per-organization policy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrganizationConfig {
    /// The login name of the organization
    pub org_name: String,
    /// Name of the team that maintains the organization's repositories
    pub maintainer: String,
    /// The branch that must carry protection rules
    #[serde(default = "default_protected_branch")]
    pub protected_branch: String,
    /// Labels the organization wants on its repositories (stored only)
    #[serde(default)]
    pub labels: Vec<LabelConfig>,
    /// Issue/PR template paths (stored only)
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

fn default_protected_branch() -> String {
    DEFAULT_PROTECTED_BRANCH.to_string()
}

/// Resolved bot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// GitHub personal access token
    #[serde(default)]
    pub github_token: String,

    /// Base URL of a GitHub Enterprise Server deployment, if any
    #[serde(default)]
    pub base_url: Option<String>,

    /// When true, checks run and are reported but no mutating call is issued
    #[serde(default)]
    pub dry_run: bool,

    /// The organizations to audit
    #[serde(default)]
    pub organizations: Vec<OrganizationConfig>,
}

/// Values supplied on the command line that take precedence over the file and
/// the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// GitHub token
    pub token: Option<String>,
    /// Single organization to audit (flag-based variant)
    pub org: Option<String>,
    /// Maintainer team for the single-organization variant
    pub maintainer: Option<String>,
    /// Protected branch for the single-organization variant
    pub protected_branch: Option<String>,
    /// GitHub Enterprise base URL
    pub base_url: Option<String>,
    /// Dry-run flag
    pub dry_run: bool,
}

impl Config {
    /// Loads configuration from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` when the path does not exist,
    /// `Error::FileRead` when it cannot be read, and `Error::Parse` when the
    /// contents are not valid TOML for this schema.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolves the effective configuration from all sources.
    ///
    /// Precedence: CLI overrides > environment token > configuration file.
    /// When `file` is `None` the default file name is tried in the working
    /// directory but its absence is not an error; an explicitly named file
    /// must exist. When the overrides name an organization, the flag-based
    /// single-organization shape replaces whatever the file configured.
    ///
    /// # Errors
    ///
    /// Returns file and parse errors from loading, plus validation errors for
    /// a missing token, an empty organization list, or an organization
    /// without a maintainer team.
    pub fn resolve(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, Error> {
        let mut config = match file {
            Some(path) => Config::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILENAME);
                if default.exists() {
                    Config::from_file(default)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(token) = overrides.token {
            config.github_token = token;
        }
        if config.github_token.is_empty() {
            if let Some(token) = token_from_env() {
                config.github_token = token;
            }
        }

        if let Some(base_url) = overrides.base_url {
            config.base_url = Some(base_url);
        }
        if overrides.dry_run {
            config.dry_run = true;
        }

        if let Some(org) = overrides.org {
            config.organizations = vec![OrganizationConfig {
                org_name: org,
                maintainer: overrides.maintainer.unwrap_or_default(),
                protected_branch: overrides
                    .protected_branch
                    .unwrap_or_else(default_protected_branch),
                labels: Vec::new(),
                templates: BTreeMap::new(),
            }];
        }

        for org in &mut config.organizations {
            if org.protected_branch.is_empty() {
                org.protected_branch = default_protected_branch();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingToken`, `Error::NoOrganizations`, or
    /// `Error::MissingMaintainer` for the corresponding gaps.
    pub fn validate(&self) -> Result<(), Error> {
        if self.github_token.is_empty() {
            return Err(Error::MissingToken);
        }
        if self.organizations.is_empty() {
            return Err(Error::NoOrganizations);
        }
        for org in &self.organizations {
            if org.maintainer.is_empty() {
                return Err(Error::MissingMaintainer {
                    org: org.org_name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|value| !value.is_empty()))
}
