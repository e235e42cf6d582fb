//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.devpulse.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".devpulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Backend API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Credential storage settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: OutputFormat::default(),
        }
    }
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries of the analysis fetch on transient failure.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base delay between retries, doubled on each attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// How long to wait for report, recommendations and trends once the
    /// analysis is in.
    #[serde(default = "default_secondary_wait")]
    pub secondary_wait_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff(),
            secondary_wait_ms: default_secondary_wait(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn secondary_wait(&self) -> Duration {
        Duration::from_millis(self.secondary_wait_ms)
    }
}

pub fn default_base_url() -> String {
    "http://localhost:8083/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    250
}

fn default_secondary_wait() -> u64 {
    2000
}

/// Credential storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// File holding the bearer token between invocations.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

fn default_token_file() -> PathBuf {
    PathBuf::from(".devpulse-token")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// where the CLI actually provided a value.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.api.retries = retries;
        }
        if let Some(ref token_file) = args.token_file {
            self.auth.token_file = token_file.clone();
        }

        if let crate::cli::Command::Analyze(ref analyze) = args.command {
            if let Some(format) = analyze.format {
                self.general.format = format;
            }
            if let Some(wait) = analyze.secondary_wait_ms {
                self.api.secondary_wait_ms = wait;
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the merged settings with the same rules `Args::validate`
    /// applies to the matching flags.
    pub fn validate(&self) -> Result<()> {
        if self.api.timeout_seconds == 0 {
            anyhow::bail!("api.timeout_seconds must be at least 1 second");
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!("api.base_url must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{AnalyzeArgs, Args, Command};

    fn make_args(command: Command) -> Args {
        Args {
            api_url: None,
            config: None,
            token_file: None,
            timeout: None,
            retries: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout_from_file() {
        let config: Config = toml::from_str("[api]\ntimeout_seconds = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));

        let mut config = config;
        config.merge_with_args(&Args {
            timeout: Some(5),
            ..make_args(Command::Logout)
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config: Config = toml::from_str("[api]\nbase_url = \"localhost:8083\"\n").unwrap();
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8083/api");
        assert_eq!(config.api.retries, 2);
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.auth.token_file, PathBuf::from(".devpulse-token"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
format = "json"

[api]
base_url = "https://pulse.example.com/api"
retries = 5

[auth]
token_file = "/tmp/pulse-token"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.api.base_url, "https://pulse.example.com/api");
        assert_eq!(config.api.retries, 5);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.auth.token_file, PathBuf::from("/tmp/pulse-token"));
    }

    #[test]
    fn test_merge_only_overrides_provided_flags() {
        let mut config: Config = toml::from_str(
            r#"
[api]
base_url = "https://pulse.example.com/api"
timeout_seconds = 10
"#,
        )
        .unwrap();

        let mut args = make_args(Command::Analyze(AnalyzeArgs {
            username: "octocat".to_string(),
            format: Some(OutputFormat::Json),
            output: None,
            secondary_wait_ms: Some(500),
            fail_on: None,
        }));
        args.retries = Some(0);

        config.merge_with_args(&args);

        assert_eq!(config.api.base_url, "https://pulse.example.com/api");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.api.retries, 0);
        assert_eq!(config.api.secondary_wait_ms, 500);
        assert_eq!(config.general.format, OutputFormat::Json);

        args.api_url = Some("http://127.0.0.1:9000/api".to_string());
        config.merge_with_args(&args);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000/api");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[auth]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.api.base_url, default_base_url());
    }
}
