pub mod config;
pub mod doctor;

use clap::{Parser, Subcommand};

/// club-gateway — the conversational registration backend.
#[derive(Debug, Parser)]
#[command(name = "club-gateway", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration and adapters.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Loads the configuration from the path named by `CLUB_CONFIG` (or
/// `config.toml` by default). Shared by `serve`, `doctor`, and `config`
/// subcommands so the logic lives in one place.
pub fn load_config() -> anyhow::Result<(club_domain::config::Config, String)> {
    let config_path = std::env::var("CLUB_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = club_domain::config::Config::load(Some(std::path::Path::new(&config_path)))
        .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?;
    Ok((config, config_path))
}
