use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable that relocates the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CURSOR_SYNC_CONFIG_DIR";

/// Name of the directory Cursor keeps its rules, prompts and MCP manifest in.
pub const SYNC_DIR_NAME: &str = ".cursor";

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - `$CURSOR_SYNC_CONFIG_DIR` when set
    /// - Linux: $XDG_CONFIG_HOME/cursor-sync or ~/.config/cursor-sync
    /// - macOS: ~/Library/Application Support/cursor-sync
    /// - Windows: %APPDATA%\cursor-sync
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        #[cfg(target_os = "linux")]
        {
            // Follow XDG Base Directory Specification
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join("cursor-sync"))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join("cursor-sync"))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join("Library").join("Application Support").join("cursor-sync"))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join("cursor-sync"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".cursor-sync"))
        }
    }

    /// Get the persisted key-value state file path (state.json)
    pub fn state_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("state.json"))
    }

    /// Get the settings file path (config.toml)
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the directory holding per-target lock files
    pub fn locks_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("locks"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("cursor-sync.log"))
    }

    /// Get the user-wide Cursor directory (~/.cursor)
    pub fn global_sync_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(SYNC_DIR_NAME))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
        Ok(config_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_paths() {
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(!config_dir.as_os_str().is_empty());

        let state_path = ConfigManager::state_file_path().unwrap();
        assert!(state_path.to_string_lossy().ends_with("state.json"));

        let settings = ConfigManager::settings_path().unwrap();
        assert!(settings.to_string_lossy().ends_with("config.toml"));

        let log = ConfigManager::log_file_path().unwrap();
        assert!(log.to_string_lossy().ends_with("cursor-sync.log"));

        let global = ConfigManager::global_sync_dir().unwrap();
        assert!(global.ends_with(SYNC_DIR_NAME));
    }

    #[test]
    #[serial]
    fn test_env_override_respected() {
        std::env::set_var(CONFIG_DIR_ENV, "/tmp/cursor-sync-test-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);
        assert_eq!(config_dir, PathBuf::from("/tmp/cursor-sync-test-config"));
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_xdg_config_home_respected() {
        std::env::remove_var(CONFIG_DIR_ENV);
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-xdg-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        std::env::remove_var("XDG_CONFIG_HOME");
        assert!(config_dir.to_string_lossy().contains("/tmp/test-xdg-config/cursor-sync"));
    }
}
