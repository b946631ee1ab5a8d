use anyhow::Result;
use autobid_core::tracing::InstrumentationConfig;
use autobid_core::tracing::init::init_tracing;
use std::path::Path;
use tracing::Level;

/// Log file written under the data directory
const LOG_FILE: &str = "cli.log";

/// Initialize logging for the CLI
///
/// Logs go to stderr, and unless `no_file_log` is set, also to `cli.log` in
/// the data directory. `RUST_LOG` overrides `log_level`.
pub fn init_logging(log_level: Level, data_dir: &Path, no_file_log: bool) -> Result<()> {
    let mut config = InstrumentationConfig::from_env().with_log_level(filter_for(log_level));
    if !no_file_log {
        config = config.with_log_file(data_dir.join(LOG_FILE));
    }
    init_tracing(&config)?;
    Ok(())
}

fn filter_for(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("autobid={level},autobid_http={level},autobid_core={level}")
}
