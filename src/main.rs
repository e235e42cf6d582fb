//! DevPulse - developer well-being insights from GitHub activity
//!
//! A CLI client for the DevPulse backend: fetches precomputed commit-pattern
//! metrics for a GitHub user and renders them as classified metric cards.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error, or the analysis for the user could not be loaded
//!   2 - A metric is classified at or above the --fail-on level

mod analysis;
mod api;
mod cli;
mod config;
mod error;
mod models;
mod report;

use analysis::{
    wait_for_secondaries, wait_until, Aggregator, Classification, RetryPolicy, ViewState,
};
use anyhow::{Context, Result};
use api::{
    ApiClient, AuthService, DevPulseService, FileCredentialStore, GitHubService, LoginPrompt,
};
use cli::{AnalyzeArgs, Args, Command, LoginArgs, OutputFormat, RegisterArgs};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // No logging or network needed
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&args);

    info!("DevPulse v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `init-config`: generate a default .devpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your backend and tune retries and timeouts.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the subcommand. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;
    let client = Arc::new(build_client(&config)?);
    debug!(
        "Backend: {} (timeout {}s, {} retries)",
        client.base_url(),
        config.api.timeout_seconds,
        config.api.retries
    );

    match args.command {
        Command::Analyze(ref analyze) => run_analyze(analyze, &config, client, args.quiet).await,
        Command::Login(ref login) => handle_login(login, client).await,
        Command::Register(ref register) => handle_register(register, client).await,
        Command::Logout => Ok(handle_logout(client)),
        Command::Whoami => handle_whoami(client).await,
        Command::Profile => handle_profile(client).await,
        Command::Repos => handle_repos(client).await,
        Command::Contributions => handle_contributions(client).await,
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

fn build_client(config: &Config) -> Result<ApiClient> {
    let store = Arc::new(FileCredentialStore::open(config.auth.token_file.clone()));
    ApiClient::new(&config.api, store, Arc::new(LoginPrompt))
        .context("Failed to create HTTP client")
}

/// Run the analysis workflow for one user.
async fn run_analyze(
    analyze: &AnalyzeArgs,
    config: &Config,
    client: Arc<ApiClient>,
    quiet: bool,
) -> Result<i32> {
    let start_time = Instant::now();

    let service = Arc::new(DevPulseService::new(client));
    let aggregator = Aggregator::new(service, RetryPolicy::from_config(&config.api));

    let spinner = new_spinner(quiet);
    spinner.set_message(format!("Analyzing {}...", analyze.username.trim()));

    let mut rx = aggregator.select(&analyze.username)?;
    let mut state = wait_until(&mut rx, ViewState::is_settled).await;

    if state.view().is_some() {
        spinner.set_message("Loading report, recommendations and trends...");
        state = wait_for_secondaries(&mut rx, config.api.secondary_wait()).await;
    }
    spinner.finish_and_clear();

    let view = match state {
        ViewState::Ready(view) => view,
        ViewState::Error { username, error } => {
            if error.is_not_found() {
                eprintln!("\n❌ User '{}' was not found.", username);
            } else {
                eprintln!("\n❌ Analysis unavailable for {}: {}", username, error);
            }
            return Ok(1);
        }
        ViewState::Idle | ViewState::Loading { .. } => {
            anyhow::bail!("analysis ended without a result")
        }
    };

    if !view.sources.all_settled() {
        warn!("Some secondary data did not arrive in time; defaults are shown");
    }

    let classification = Classification::of(&view);

    println!("\n📊 DevPulse Summary for {}:", view.username);
    println!("{}", report::terminal_summary(&view, &classification));

    if let Some(ref path) = analyze.output {
        let content = match config.general.format {
            OutputFormat::Json => report::generate_json_report(&view, &classification)?,
            OutputFormat::Markdown => report::generate_markdown_report(&view, &classification),
        };
        std::fs::write(path, &content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("\n✅ Report saved to: {}", path.display());
    }

    println!(
        "   Duration: {:.1}s",
        start_time.elapsed().as_secs_f64()
    );

    if let Some(fail_level) = analyze.fail_on {
        let worst = classification.worst();
        if fail_level.is_tripped_by(worst) {
            eprintln!(
                "\n⛔ Metrics classified as {} at or above {:?}. Failing (exit code 2).",
                worst, fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

fn new_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn handle_login(login: &LoginArgs, client: Arc<ApiClient>) -> Result<i32> {
    let auth = AuthService::new(client);
    let response = auth
        .login(login.email.trim(), &login.password)
        .await
        .context("Login failed")?;

    println!(
        "✅ Signed in as {} <{}>",
        response.user.name, response.user.email
    );
    Ok(0)
}

async fn handle_register(register: &RegisterArgs, client: Arc<ApiClient>) -> Result<i32> {
    let auth = AuthService::new(client);
    let response = auth
        .register(register.name.trim(), register.email.trim(), &register.password)
        .await
        .context("Registration failed")?;

    println!(
        "✅ Registered and signed in as {} <{}>",
        response.user.name, response.user.email
    );
    Ok(0)
}

fn handle_logout(client: Arc<ApiClient>) -> i32 {
    let auth = AuthService::new(client);
    if auth.logout() {
        println!("👋 Signed out.");
    } else {
        println!("Not signed in.");
    }
    0
}

async fn handle_whoami(client: Arc<ApiClient>) -> Result<i32> {
    let auth = AuthService::new(client);
    if !auth.is_authenticated() {
        eprintln!("Not signed in. Run `devpulse login` first.");
        return Ok(1);
    }

    let user = auth.current_user().await.context("Failed to fetch current user")?;
    println!("👤 {} <{}> (id {})", user.name, user.email, user.id);
    Ok(0)
}

async fn handle_profile(client: Arc<ApiClient>) -> Result<i32> {
    let github = GitHubService::new(client);
    let profile = github.profile().await.context("Failed to fetch GitHub profile")?;

    println!("🐙 {}", profile.name.as_deref().unwrap_or(&profile.login));
    println!("   Login: {}", profile.login);
    if let Some(ref bio) = profile.bio {
        println!("   Bio: {}", bio);
    }
    println!(
        "   Public repos: {} | Followers: {} | Following: {}",
        profile.public_repos, profile.followers, profile.following
    );
    Ok(0)
}

async fn handle_repos(client: Arc<ApiClient>) -> Result<i32> {
    let github = GitHubService::new(client);
    let repos = github
        .repositories()
        .await
        .context("Failed to fetch repositories")?;

    if repos.is_empty() {
        println!("No repositories found.");
        return Ok(0);
    }

    println!("📚 {} repositories:\n", repos.len());
    for repo in &repos {
        println!(
            "   ⭐ {:>5}  {} ({})",
            repo.stargazers_count,
            repo.name,
            repo.language.as_deref().unwrap_or("unknown")
        );
        if let Some(ref description) = repo.description {
            println!("            {}", description);
        }
    }
    Ok(0)
}

async fn handle_contributions(client: Arc<ApiClient>) -> Result<i32> {
    let github = GitHubService::new(client);
    let events = github
        .contributions()
        .await
        .context("Failed to fetch contributions")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&events).context("Failed to format contributions")?
    );
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
