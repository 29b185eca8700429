//! mediacast-post - Publish one catalog post to a social platform
//!
//! Meant to be run periodically by cron or a systemd timer, one invocation
//! per platform.

use anyhow::{Context, Result};
use clap::Parser;
use libmediacast::config::Config;
use libmediacast::logging::LoggingConfig;
use libmediacast::{Database, MediacastError, Platform, PostMode, PostingJob, RunOutcome};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "mediacast-post")]
#[command(version)]
#[command(about = "Publish one media post from the catalog to a social platform")]
#[command(long_about = "\
mediacast-post - Publish one media post from the catalog to a social platform

DESCRIPTION:
    Picks a random catalog item that has not been posted to PLATFORM within
    the cooldown window, optionally gathers eligible items from the same
    group, and publishes them as a single post or a carousel. Every item
    that was staged gets its cooldown timestamp updated.

USAGE:
    mediacast-post instagram
    mediacast-post x --format json
    mediacast-post facebook --mode single --strict

CONFIGURATION:
    Configuration file: ~/.config/mediacast/config.toml
    (override with --config or MEDIACAST_CONFIG)

EXIT CODES:
    0 - Posted, nothing to post, or a handled failure (without --strict)
    1 - Configuration, database or posting error
    2 - Authentication rejected by the platform
    3 - Invalid input (unknown platform, mode or format)
")]
struct Cli {
    /// Target platform (instagram, facebook, x)
    platform: String,

    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured post mode (single, carousel, random)
    #[arg(short, long)]
    mode: Option<String>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Exit non-zero when the run fails
    #[arg(long)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Invalid format: '{}'. Valid options: text, json",
                s
            )),
        }
    }
}

/// Parsed and validated command-line arguments
struct Request {
    platform: Platform,
    mode: Option<PostMode>,
    format: OutputFormat,
}

fn parse_request(cli: &Cli) -> std::result::Result<Request, MediacastError> {
    let platform = cli
        .platform
        .parse::<Platform>()
        .map_err(MediacastError::InvalidInput)?;
    let mode = cli
        .mode
        .as_deref()
        .map(str::parse::<PostMode>)
        .transpose()
        .map_err(MediacastError::InvalidInput)?;
    let format = cli
        .format
        .parse::<OutputFormat>()
        .map_err(MediacastError::InvalidInput)?;

    Ok(Request {
        platform,
        mode,
        format,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    let request = match parse_request(&cli) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    match run(&cli, &request).await {
        Ok(outcome) => {
            print_outcome(&outcome, request.format);
            if cli.strict && outcome.is_failure() {
                std::process::exit(outcome.exit_code());
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

async fn run(cli: &Cli, request: &Request) -> Result<RunOutcome> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    let mut settings = config.publish_settings(request.platform)?;
    if let Some(mode) = request.mode {
        debug!("Post mode overridden to {:?}", mode);
        settings.mode = mode;
    }

    let db_path = config.database_path();
    let db = Database::new(&db_path.to_string_lossy())
        .await
        .with_context(|| format!("Failed to open catalog at {}", db_path.display()))?;

    let job = PostingJob::with_settings(&config, settings, Arc::new(db.clone()));
    let outcome = match job {
        Ok(mut job) => {
            info!("Running {} posting job", job.platform());
            Ok(job.run().await)
        }
        Err(e) => Err(e),
    };

    db.close().await;
    Ok(outcome?)
}

fn print_outcome(outcome: &RunOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", outcome),
        OutputFormat::Json => println!("{}", outcome.to_json()),
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<MediacastError>()
        .map(MediacastError::exit_code)
        .unwrap_or(1)
}
