//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Variant;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// DevPulse - developer well-being insights from GitHub activity
///
/// Fetches precomputed commit-pattern metrics for a GitHub user from a
/// DevPulse backend and shows them as classified metric cards.
///
/// Examples:
///   devpulse analyze octocat
///   devpulse analyze octocat --format json --output octocat.json
///   devpulse --api-url https://pulse.example.com/api login --email me@example.com
///   devpulse init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// DevPulse backend base URL
    ///
    /// Defaults to the config file value, then http://localhost:8083/api.
    #[arg(long, global = true, value_name = "URL", env = "DEVPULSE_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .devpulse.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File used to keep the session token between runs
    #[arg(long, global = true, value_name = "FILE", env = "DEVPULSE_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Retries of the analysis request on network or server errors
    #[arg(long, global = true, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze the commit well-being of a GitHub user
    Analyze(AnalyzeArgs),

    /// Sign in and store the session token
    Login(LoginArgs),

    /// Create an account and store the session token
    Register(RegisterArgs),

    /// Forget the stored session token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show the GitHub profile linked to the signed-in user
    Profile,

    /// List the repositories linked to the signed-in user
    Repos,

    /// Dump the raw contribution events of the signed-in user
    Contributions,

    /// Generate a default .devpulse.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// GitHub username to analyze
    pub username: String,

    /// Report format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the full report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// How long to wait for secondary data once the analysis is in
    #[arg(long, value_name = "MS")]
    pub secondary_wait_ms: Option<u64>,

    /// Exit with code 2 if any metric is classified at or above this level
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "DEVPULSE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long, env = "DEVPULSE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOnLevel {
    Warning,
    Danger,
}

impl FailOnLevel {
    /// Whether a classified metric trips this threshold.
    pub fn is_tripped_by(&self, variant: Variant) -> bool {
        let threshold = match self {
            FailOnLevel::Warning => Variant::Warning,
            FailOnLevel::Danger => Variant::Danger,
        };
        variant.rank() >= threshold.rank()
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match self.command {
            Command::Analyze(ref analyze) if analyze.username.trim().is_empty() => {
                Err("Username must not be empty".to_string())
            }
            Command::Login(ref login) if login.email.trim().is_empty() => {
                Err("Email must not be empty".to_string())
            }
            Command::Register(ref register) if register.email.trim().is_empty() => {
                Err("Email must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
