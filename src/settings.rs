use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::conflict::ConflictPolicy;
use crate::error::SyncError;
use crate::repo_url::RepositoryIdentity;

/// Environment variable that overrides `github_token` from the settings file.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const MIN_INTERVAL_MINUTES: u32 = 5;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

/// Where a sync goes when the command does not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultTarget {
    Global,
    Workspace,
    Ask,
}

impl FromStr for DefaultTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(DefaultTarget::Global),
            "workspace" => Ok(DefaultTarget::Workspace),
            "ask" => Ok(DefaultTarget::Ask),
            other => Err(SyncError::InvalidSetting {
                field: "default_sync_target".into(),
                detail: format!("'{other}' is not one of global, workspace, ask"),
            }
            .into()),
        }
    }
}

impl fmt::Display for DefaultTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DefaultTarget::Global => "global",
            DefaultTarget::Workspace => "workspace",
            DefaultTarget::Ask => "ask",
        })
    }
}

/// User settings stored in `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Repository reference: `owner/repo`, a web URL or an SSH remote
    pub repo_url: String,

    /// Branch that is read from and written to
    pub branch: String,

    /// Directory inside the repository that mirrors the sync root
    pub repo_path: String,

    pub default_sync_target: DefaultTarget,

    pub auto_sync_enabled: bool,

    /// Minutes between automatic pulls (5-1440)
    pub auto_sync_interval_minutes: u32,

    pub sync_on_startup: bool,

    /// Pull into a workspace that has no `.cursor` directory yet
    pub sync_on_new_workspace: bool,

    /// Personal access token; `GITHUB_TOKEN` takes precedence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    pub conflict_resolution: ConflictPolicy,

    /// Glob patterns selecting the files to sync
    pub files_to_sync: Vec<String>,

    /// REST API base, change for GitHub Enterprise
    pub api_url: String,

    /// Raw content base, change for GitHub Enterprise
    pub raw_url: String,
}

pub fn default_files_to_sync() -> Vec<String> {
    vec![
        ".cursorrules".to_string(),
        ".cursor/rules/**".to_string(),
        ".cursor/mcp.json".to_string(),
        ".cursor/prompts/**".to_string(),
    ]
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            repo_url: String::new(),
            branch: "main".to_string(),
            repo_path: "cursor".to_string(),
            default_sync_target: DefaultTarget::Ask,
            auto_sync_enabled: false,
            auto_sync_interval_minutes: 30,
            sync_on_startup: false,
            sync_on_new_workspace: false,
            github_token: None,
            conflict_resolution: ConflictPolicy::Ask,
            files_to_sync: default_files_to_sync(),
            api_url: "https://api.github.com".to_string(),
            raw_url: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

/// Immutable, validated configuration handed to one sync invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub repo_url: String,
    pub branch: String,
    pub repo_path: String,
    pub patterns: Vec<String>,
    pub conflict_policy: ConflictPolicy,
    pub token: Option<String>,
    pub api_url: String,
    pub raw_url: String,
}

impl SyncConfig {
    /// Repository identity, or `NotConfigured` when `repo_url` is unusable.
    pub fn repository(&self) -> Result<RepositoryIdentity> {
        RepositoryIdentity::parse(&self.repo_url).ok_or_else(|| SyncError::NotConfigured.into())
    }
}

impl SyncSettings {
    /// Load settings from file, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::settings_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn settings_path() -> Result<PathBuf> {
        crate::config::ConfigManager::settings_path()
    }

    /// Token from the environment, else from the settings file
    pub fn effective_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .or_else(|| self.github_token.clone())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.auto_sync_interval_minutes)
        {
            return Err(SyncError::InvalidSetting {
                field: "auto_sync_interval_minutes".into(),
                detail: format!(
                    "{} is outside {MIN_INTERVAL_MINUTES}-{MAX_INTERVAL_MINUTES}",
                    self.auto_sync_interval_minutes
                ),
            }
            .into());
        }
        if self.branch.trim().is_empty() {
            return Err(SyncError::InvalidSetting {
                field: "branch".into(),
                detail: "must not be empty".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Validate and freeze into the configuration one sync run consumes
    pub fn resolve(&self) -> Result<SyncConfig> {
        self.validate()?;
        Ok(SyncConfig {
            repo_url: self.repo_url.trim().to_string(),
            branch: self.branch.trim().to_string(),
            repo_path: self.repo_path.trim().trim_matches('/').to_string(),
            patterns: self.files_to_sync.clone(),
            conflict_policy: self.conflict_resolution,
            token: self.effective_token(),
            api_url: self.api_url.trim_end_matches('/').to_string(),
            raw_url: self.raw_url.trim_end_matches('/').to_string(),
        })
    }

    /// Apply a `key=value` assignment from the command line
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |detail: String| SyncError::InvalidSetting {
            field: key.to_string(),
            detail,
        };
        let parse_bool = |v: &str| {
            v.trim()
                .parse::<bool>()
                .map_err(|_| invalid(format!("'{v}' is not true or false")))
        };

        match key {
            "repo_url" => self.repo_url = value.trim().to_string(),
            "branch" => self.branch = value.trim().to_string(),
            "repo_path" => self.repo_path = value.trim().to_string(),
            "default_sync_target" => self.default_sync_target = value.parse()?,
            "auto_sync_enabled" => self.auto_sync_enabled = parse_bool(value)?,
            "auto_sync_interval_minutes" => {
                self.auto_sync_interval_minutes = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not a number")))?
            }
            "sync_on_startup" => self.sync_on_startup = parse_bool(value)?,
            "sync_on_new_workspace" => self.sync_on_new_workspace = parse_bool(value)?,
            "github_token" => {
                let token = value.trim();
                self.github_token = (!token.is_empty()).then(|| token.to_string());
            }
            "conflict_resolution" => self.conflict_resolution = value.parse()?,
            "files_to_sync" => {
                self.files_to_sync = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            "api_url" => self.api_url = value.trim().to_string(),
            "raw_url" => self.raw_url = value.trim().to_string(),
            _ => return Err(invalid("unknown setting".to_string()).into()),
        }

        self.validate()
    }
}

/// Update settings from `key=value` assignments
pub fn update_config(assignments: &[String]) -> Result<()> {
    let mut settings = SyncSettings::load()?;

    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected key=value, got '{assignment}'"))?;
        settings.set(key.trim(), value)?;
        println!("{}", format!("Set {}", key.trim()).green());
    }

    settings.save()?;
    println!("{}", "Configuration saved successfully!".green().bold());

    Ok(())
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}****")
}

/// Show the current settings
pub fn show_config() -> Result<()> {
    let settings = SyncSettings::load()?;
    print_settings(&settings);
    Ok(())
}

pub fn print_settings(settings: &SyncSettings) {
    println!("{}", "Current Configuration:".bold());
    println!(
        "  {}: {}",
        "Repository".cyan(),
        if settings.repo_url.is_empty() {
            "Not set".yellow().to_string()
        } else {
            settings.repo_url.clone()
        }
    );
    println!("  {}: {}", "Branch".cyan(), settings.branch);
    println!("  {}: {}", "Repository path".cyan(), settings.repo_path);
    println!("  {}: {}", "Default target".cyan(), settings.default_sync_target);
    println!(
        "  {}: {} (every {} minutes)",
        "Auto sync".cyan(),
        if settings.auto_sync_enabled { "on" } else { "off" },
        settings.auto_sync_interval_minutes
    );
    println!("  {}: {}", "Sync on startup".cyan(), settings.sync_on_startup);
    println!(
        "  {}: {}",
        "Sync on new workspace".cyan(),
        settings.sync_on_new_workspace
    );
    println!(
        "  {}: {}",
        "Token".cyan(),
        settings
            .effective_token()
            .map(|t| mask_token(&t).green())
            .unwrap_or_else(|| "Not set (push disabled)".yellow())
    );
    println!(
        "  {}: {}",
        "Conflict resolution".cyan(),
        settings.conflict_resolution
    );
    println!(
        "  {}: {}",
        "Files to sync".cyan(),
        settings.files_to_sync.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let settings = SyncSettings::default();
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.repo_path, "cursor");
        assert_eq!(settings.files_to_sync.len(), 4);
        assert_eq!(settings.conflict_resolution, ConflictPolicy::Ask);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: SyncSettings =
            toml::from_str("repo_url = \"octo/dotfiles\"\nconflict_resolution = \"useRemote\"\n")
                .unwrap();
        assert_eq!(settings.repo_url, "octo/dotfiles");
        assert_eq!(settings.conflict_resolution, ConflictPolicy::UseRemote);
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.files_to_sync, default_files_to_sync());
    }

    #[test]
    fn test_interval_bounds() {
        let mut settings = SyncSettings::default();
        settings.auto_sync_interval_minutes = 4;
        assert!(settings.validate().is_err());
        settings.auto_sync_interval_minutes = 1441;
        assert!(settings.validate().is_err());
        settings.auto_sync_interval_minutes = 1440;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_set_assignments() {
        let mut settings = SyncSettings::default();
        settings.set("files_to_sync", "mcp.json, rules/**").unwrap();
        assert_eq!(settings.files_to_sync, vec!["mcp.json", "rules/**"]);

        settings.set("conflict_resolution", "keepLocal").unwrap();
        assert_eq!(settings.conflict_resolution, ConflictPolicy::KeepLocal);

        settings.set("default_sync_target", "workspace").unwrap();
        assert_eq!(settings.default_sync_target, DefaultTarget::Workspace);

        assert!(settings.set("auto_sync_enabled", "maybe").is_err());
        assert!(settings.set("no_such_key", "1").is_err());
        assert!(settings.set("auto_sync_interval_minutes", "2").is_err());
    }

    #[test]
    #[serial]
    fn test_env_token_overrides_settings() {
        let settings = SyncSettings {
            github_token: Some("from-file".into()),
            ..Default::default()
        };

        std::env::set_var(TOKEN_ENV, "from-env");
        let token = settings.effective_token();
        std::env::remove_var(TOKEN_ENV);
        assert_eq!(token.as_deref(), Some("from-env"));

        assert_eq!(settings.effective_token().as_deref(), Some("from-file"));
    }

    #[test]
    #[serial]
    fn test_resolve_trims_and_freezes() {
        std::env::remove_var(TOKEN_ENV);
        let settings = SyncSettings {
            repo_url: " octo/dotfiles ".into(),
            repo_path: "/cursor/".into(),
            api_url: "https://ghe.example.com/api/v3/".into(),
            ..Default::default()
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.repo_path, "cursor");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.token, None);
        assert_eq!(config.repository().unwrap().to_string(), "octo/dotfiles");
    }

    #[test]
    fn test_unparseable_repository_is_not_configured() {
        let config = SyncSettings {
            repo_url: "nonsense".into(),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let err = config.repository().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::NotConfigured)
        ));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ghp_abcdef"), "ghp_****");
    }
}
