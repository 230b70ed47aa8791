//! Smoke Runner
//!
//! Command-line smoke tests for the deployed cloud functions:
//! 1. Signs in to the identity provider and force-refreshes the ID token
//! 2. Sends each operation of the chosen scenario with that bearer token
//! 3. Logs every response, or the structured failure that stopped the run
//! 4. Exits 0 when every operation succeeded, 1 otherwise

mod config;
mod error;
mod run;
mod runner;
mod scenario;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use identity_auth::{IdentityClient, PasswordSignIn, PasswordSignUp, TokenSource};
use remote_op::Dispatcher;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::Config;
use crate::runner::{RunReport, Runner};
use crate::scenario::Step;

#[derive(Parser)]
#[command(
    name = "smoke-runner",
    version,
    about = "Authenticated smoke tests for remote operation endpoints"
)]
struct Cli {
    /// Config file path (falls back to CONFIG_PATH, then smoke-runner.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create buckets, upload files, generate requirements
    Buckets,
    /// Trigger the code update, then the data update
    Update,
    /// Destroy the user's remote resources
    Destroy,
    /// Request a signed URL for the output workspace
    WorkspaceUrl,
    /// Read a file back from the bucket
    Read {
        #[arg(long)]
        path: String,
    },
    /// Request a signed download URL for a bucket file
    Download {
        #[arg(long)]
        path: String,
    },
    /// Create the configured account
    Signup,
    /// Send one ad-hoc operation
    Call {
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "POST")]
        method: String,
        /// Operation name merged into the body as `operation`
        #[arg(long)]
        operation: Option<String>,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

impl Command {
    fn plan(&self, config: &Config) -> common::Result<Vec<Step>> {
        match self {
            Command::Buckets => scenario::buckets(config),
            Command::Update => scenario::update(config),
            Command::Destroy => scenario::destroy(config),
            Command::WorkspaceUrl => scenario::workspace_url(config),
            Command::Read { path } => scenario::read(config, path),
            Command::Download { path } => scenario::download(config, path),
            Command::Signup => Ok(Vec::new()),
            Command::Call {
                url,
                method,
                operation,
                body,
            } => scenario::call(url, method, operation.clone(), body.as_deref()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // .env first so LOG_LEVEL and the identity secrets can come from it
    let dotenv = dotenvy::dotenv();

    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    let cli = Cli::parse();

    let (config, steps) = prepare(cli.config.as_deref(), &cli.command)?;
    let api_key = config.api_key()?;
    let credentials = config.credentials()?;

    info!(
        email = %config.identity.email,
        identity_url = %config.identity.identity_url,
        steps = steps.len(),
        headers = config.headers.len(),
        timeout_secs = ?config.request.timeout_secs,
        "configuration loaded"
    );

    // One HTTP client for the whole run, shared by auth and dispatch
    let http = reqwest::Client::new();
    let identity = IdentityClient::new(http.clone(), api_key).with_endpoints(
        config.identity.identity_url.clone(),
        config.identity.token_url.clone(),
    );
    let dispatcher = Dispatcher::new(http).with_timeout(config.timeout());

    let source: Box<dyn TokenSource> = match &cli.command {
        Command::Signup => Box::new(PasswordSignUp::new(identity, credentials)),
        _ => Box::new(PasswordSignIn::new(
            identity,
            credentials,
            config.identity.force_refresh,
        )),
    };

    let runner = Runner {
        run_id: format!("run_{}", Uuid::new_v4().as_simple()),
        source: source.as_ref(),
        dispatcher: &dispatcher,
        headers: &config.headers,
    };
    let report = runner.execute(&steps).await;
    summarize(&cli.command, &report);

    Ok(ExitCode::from(exit_status(&report)))
}

/// Load the config and plan the chosen scenario. Any error here ends the
/// process with exit code 1 before a token is requested.
fn prepare(cli_config: Option<&str>, command: &Command) -> Result<(Config, Vec<Step>)> {
    let config_path = Config::resolve_path(cli_config);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let steps = command
        .plan(&config)
        .context("failed to plan scenario")?;
    Ok((config, steps))
}

fn exit_status(report: &RunReport) -> u8 {
    u8::try_from(report.exit_code).unwrap_or(1)
}

/// `signed_url` from the first response of a successful workspace-url or
/// download run.
fn signed_url<'a>(command: &Command, report: &'a RunReport) -> Option<&'a str> {
    if report.exit_code != 0 {
        return None;
    }
    match command {
        Command::WorkspaceUrl | Command::Download { .. } => report
            .responses
            .first()
            .and_then(|body| body.get("signed_url"))
            .and_then(|url| url.as_str()),
        _ => None,
    }
}

/// Scenario-specific highlights on top of the per-step logs.
fn summarize(command: &Command, report: &RunReport) {
    if report.exit_code != 0 {
        return;
    }
    match command {
        Command::Signup => {
            info!(user_id = ?report.user_id, "signup completed");
        }
        Command::WorkspaceUrl | Command::Download { .. } => match signed_url(command, report) {
            Some(url) => info!(signed_url = url, "signed URL issued"),
            None => warn!("response carried no signed_url"),
        },
        _ => {}
    }
}
