use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;

use crate::config::ConfigManager;

/// Largest log file kept before it is rotated to `cursor-sync.log.old`.
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Initialize the logging system
///
/// **Console logging** is controlled via the `RUST_LOG` environment variable
/// (`error`, `warn`, `info` (default), `debug`, `trace`, `off`).
///
/// **File logging** records one line per sync operation in `cursor-sync.log`
/// inside the config directory; see [`log_to_file`].
///
/// ```bash
/// RUST_LOG=debug cursor-sync pull --target workspace
/// ```
pub fn init_logger() -> Result<()> {
    ConfigManager::ensure_config_dir()?;

    let default_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(default_level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok(); // already initialized (tests, repeated calls)

    rotate_log_if_needed()?;
    log_to_file(&format!("Logger initialized with level: {default_level:?}"))?;

    Ok(())
}

/// Append a timestamped line to the log file
pub fn log_to_file(message: &str) -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;

    Ok(())
}

/// Rotate the log file once it exceeds 10MB
pub fn rotate_log_if_needed() -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;

    if log_path.exists() && std::fs::metadata(&log_path)?.len() > MAX_LOG_SIZE {
        let old_log_path = log_path.with_extension("log.old");
        if old_log_path.exists() {
            std::fs::remove_file(&old_log_path)?;
        }
        std::fs::rename(&log_path, &old_log_path)?;
        log::info!("Log file rotated to {}", old_log_path.display());
    }

    Ok(())
}
