//! shepherd: audits GitHub organization repositories against a small policy
//! and remediates drift.
//!
//! For every repository of the configured organizations, the bot checks that
//! a CODEOWNERS file exists (opening an automated PR when it does not), that
//! the maintainer team has admin access, and that the protected branch
//! requires code-owner review. With `--dry-run` the checks run and are
//! reported but nothing is changed.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use config_manager::{Config, ConfigOverrides};
use github_client::{create_token_client, GitHubClient, RepositoryClient};
use shepherd_core::{driver, PolicyBot};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

const BANNER_ART: &str = r#"
____     _   _  U _____ u  ____    _   _  U _____ u   ____     ____
/ __"| u |'| |'| \| ___"|/U|  _"\ u|'| |'| \| ___"|/U |  _"\ u |  _"\
<\___ \/ /| |_| |\ |  _|"  \| |_) |/| |_| |\ |  _|"   \| |_) |//| | | |
u___) | U|  _  |u | |___   |  __/ U|  _  |u | |___    |  _ <  U| |_| |\
|____/>> |_| |_|  |_____|  |_|     |_| |_|  |_____|   |_| \_\  |____/ u
 )(  (__)//   \\  <<   >>  ||>>_   //   \\  <<   >>   //   \\_  |||_
(__)    (_") ("_)(__) (__)(__)__) (_") ("_)(__) (__) (__)  (__)(__)_)
"#;

/// Audit and remediate GitHub organization repositories: CODEOWNERS files,
/// team ownership, and branch protection with code-owner review.
#[derive(Debug, Parser)]
#[command(name = "shepherd", disable_version_flag = true)]
struct Cli {
    /// GitHub token used for API calls (falls back to SHEPHERD_GITHUB_TOKEN
    /// or GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Path to a configuration file (defaults to .shepherd.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Single organization to audit (instead of a configuration file)
    #[arg(long)]
    org: Option<String>,

    /// Maintainer team for the organization given with --org
    #[arg(long)]
    maintainer: Option<String>,

    /// Protected branch name for the organization given with --org
    #[arg(long)]
    branch: Option<String>,

    /// Base URL of a GitHub Enterprise Server deployment
    #[arg(long)]
    base_url: Option<String>,

    /// Run all checks and report, but issue no mutating call
    #[arg(long)]
    dry_run: bool,

    /// Print the version banner and exit
    #[arg(long, short = 'v')]
    version: bool,
}

impl Cli {
    /// Splits the parsed arguments into the configuration file path and the
    /// override values layered on top of it.
    fn into_parts(self) -> (Option<PathBuf>, ConfigOverrides) {
        let overrides = ConfigOverrides {
            token: self.token,
            org: self.org,
            maintainer: self.maintainer,
            protected_branch: self.branch,
            base_url: self.base_url,
            dry_run: self.dry_run,
        };
        (self.config, overrides)
    }
}

fn banner() -> String {
    format!(
        "{}\nensures your GitHub repositories are herded like sheep\nVersion: {}\n",
        BANNER_ART,
        env!("CARGO_PKG_VERSION")
    )
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("SHEPHERD_LOG"))
        .init();

    let cli = Cli::parse();
    if cli.version {
        print!("{}", banner());
        return;
    }

    let (config_path, overrides) = cli.into_parts();
    let config = match Config::resolve(config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to resolve configuration");
            process::exit(1);
        }
    };

    let octocrab = match create_token_client(&config.github_token, config.base_url.as_deref()) {
        Ok(octocrab) => octocrab,
        Err(e) => {
            error!(error = %e, "Failed to create GitHub client");
            process::exit(1);
        }
    };
    let client: Arc<dyn RepositoryClient> = Arc::new(GitHubClient::new(octocrab));

    let bot = match PolicyBot::new(client, &config).await {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %e, "Failed to resolve organizations");
            process::exit(1);
        }
    };

    if let Err(e) = driver::run(&bot, config.dry_run, &driver::ConsoleReporter).await {
        error!(error = %e, "Reconciliation run failed");
        process::exit(1);
    }
}
