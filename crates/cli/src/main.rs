//! Ondu command line entry point

mod commands;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use ondu_config::{load_settings_from, Settings};

#[derive(Parser, Debug)]
#[command(name = "ondu", version, about = "Listen to articles paragraph by paragraph")]
struct Cli {
    /// Configuration environment layered over `config/default`
    #[arg(long, global = true, env = "ONDU_ENV")]
    config_env: Option<String>,

    /// Backend origin, overriding the configured one
    #[arg(long, global = true, env = "ONDU_BASE_URL")]
    base_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List converted articles
    List,

    /// Show an article with per-paragraph audio status
    Show { article_id: String },

    /// Delete an article
    Delete { article_id: String },

    /// Upload text or a .txt/.pdf file for conversion
    Upload {
        /// Raw text to convert
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// File to convert
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Query a background task
    Status { task_id: String },

    /// Play an article with live word highlighting
    Read {
        article_id: String,

        /// Paragraph to start from (1-based)
        #[arg(long, default_value_t = 1)]
        start: usize,
    },

    /// Print estimated word timings for a text
    Timings {
        /// Audio duration in seconds
        #[arg(long)]
        duration: f64,

        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = resolve_settings(&cli, Path::new("config"))?;
    init_tracing(&settings);
    settings.validate().context("Invalid configuration")?;
    tracing::debug!(base_url = %settings.api.base_url, env = ?cli.config_env, "Configuration loaded");

    match cli.command {
        Command::List => commands::list(&settings, cli.json).await,
        Command::Show { article_id } => commands::show(&settings, &article_id, cli.json).await,
        Command::Delete { article_id } => commands::delete(&settings, &article_id).await,
        Command::Upload { text, file } => {
            commands::upload(&settings, text.as_deref(), file.as_deref(), cli.json).await
        }
        Command::Status { task_id } => commands::status(&settings, &task_id, cli.json).await,
        Command::Read { article_id, start } => commands::read(&settings, &article_id, start).await,
        Command::Timings { duration, text } => commands::timings(&text, duration, cli.json),
    }
}

/// Configured settings with command line overrides applied, not yet validated
fn resolve_settings(cli: &Cli, dir: &Path) -> Result<Settings> {
    let mut settings = load_settings_from(dir, cli.config_env.as_deref())
        .context("Failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        settings.api.base_url = base_url.clone();
    }
    Ok(settings)
}

/// Logs go to stderr so command output stays pipeable
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("ondu={}", level).into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
