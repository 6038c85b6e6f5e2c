use clap::{Parser, Subcommand};

/// CLI surface definition. Serving the API is the default mode; the other
/// subcommands are small operational helpers.
#[derive(Parser, Debug)]
#[command(
    name = "docketd",
    about = "Task-management REST API backed by a flat JSON file",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to `serve` when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server.
    Serve {
        /// Listen address (host:port), overriding the config file.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print version and exit.
    Version,
    /// Run a health check against the task store.
    Health,
    /// Manage configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
