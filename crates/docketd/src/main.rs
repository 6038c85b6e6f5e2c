mod cli;
mod config;
mod rest;
mod storage;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use docket_core::tasks::TaskRepository;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the REST server.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command.unwrap_or(cli::Command::Serve { bind: None }) {
        cli::Command::Serve { bind } => run_server(bind, &config).await?,
        cli::Command::Version => print_version(),
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("docketd {}", env!("CARGO_PKG_VERSION"));
}

async fn run_server(bind_override: Option<String>, config: &config::Config) -> Result<()> {
    let repo = Arc::new(storage::repo_from_config(config)?);
    let bind = bind_override
        .or_else(|| config.bind.clone())
        .unwrap_or_else(|| rest::DEFAULT_BIND.to_string());
    rest::serve(&bind, repo).await
}

/// Runs a quick health check of the durable task store.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let repo = storage::repo_from_config(config)?;
    let count = run_repo_health(&repo).await?;
    println!("Storage: ok ({count} tasks)");
    Ok(())
}

async fn run_repo_health<R: TaskRepository>(repo: &R) -> Result<usize> {
    let tasks = repo
        .list()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    Ok(tasks.len())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
