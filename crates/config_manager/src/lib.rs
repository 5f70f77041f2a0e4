//! Configuration loading and validation for the policy bot.
//!
//! Produces a single validated [`Config`] value at startup from the
//! supported sources: a TOML configuration file (multi-organization shape),
//! environment variables, and CLI flag overrides (single-organization shape).

pub mod errors;
pub use errors::Error;

pub mod settings;
pub use settings::{
    Config, ConfigOverrides, LabelConfig, OrganizationConfig, DEFAULT_CONFIG_FILENAME,
    DEFAULT_PROTECTED_BRANCH, TOKEN_ENV_VARS,
};
