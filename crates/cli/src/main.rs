//! autobid - command line client for the autobid car-auction marketplace

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "autobid")]
#[command(about = "Browse, sell and bid on cars from the command line")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory holding the session and log files
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::CliConfig::load(cli.config.as_deref())?;
    let data_dir = settings.resolve_data_dir(cli.data_dir);
    logging::init_logging(cli.log_level.into(), &data_dir, cli.no_file_log)?;

    debug!(data_dir = %data_dir.display(), base_url = %settings.client.base_url, "starting autobid");

    let command = cli.command.execute(settings, data_dir);
    if cli.timeout == 0 {
        if let Err(e) = command.await {
            error!("Command failed: {e}");
            std::process::exit(1);
        }
    } else {
        match tokio::time::timeout(Duration::from_secs(cli.timeout), command).await {
            Ok(Ok(())) => {
                debug!("Command completed successfully");
            }
            Ok(Err(e)) => {
                error!("Command failed: {e}");
                std::process::exit(1);
            }
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bid_command() {
        let cli = Cli::try_parse_from(["autobid", "--timeout", "0", "bid", "ad-1", "1500.50"]).unwrap();
        assert_eq!(cli.timeout, 0);
        match cli.command {
            Commands::Bid {
                car_ad_id,
                amount,
                unchecked,
            } => {
                assert_eq!(car_ad_id, "ad-1");
                assert_eq!(amount.to_string(), "1500.50");
                assert!(!unchecked);
            }
            _ => panic!("expected bid command"),
        }
    }

    #[test]
    fn test_parse_create_requires_image() {
        let result = Cli::try_parse_from([
            "autobid",
            "create",
            "--model",
            "3",
            "--registration-number",
            "ABC123",
            "--technical-data",
            "2.4 D5",
            "--equipment",
            "Tow bar",
            "--description",
            "Well kept",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::try_parse_from([
            "autobid",
            "search",
            "--keyword",
            "volvo",
            "--brand",
            "2",
            "--biddable",
        ])
        .unwrap();
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        let criteria = args.into_criteria();
        assert_eq!(criteria.keyword.as_deref(), Some("volvo"));
        assert_eq!(criteria.car_brand_id, Some(2));
        assert_eq!(criteria.is_biddable, Some(true));
        assert_eq!(criteria.is_imported, None);
    }
}
