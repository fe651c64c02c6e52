//! Configuration command handlers
//!
//! Handles menu-based configuration editing. Every change goes through
//! [`SyncSettings::set`] so the menu validates exactly like `config --set`.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{Confirm, MultiSelect, Password, Select, Text};

use crate::settings::{print_settings, SyncSettings};

const REPOSITORY: &str = "Repository (owner/repo or URL)";
const BRANCH: &str = "Branch";
const REPO_PATH: &str = "Path inside the repository";
const DEFAULT_TARGET: &str = "Default sync target";
const AUTO_SYNC: &str = "Auto sync";
const STARTUP: &str = "Sync on startup / new workspace";
const TOKEN: &str = "GitHub token";
const CONFLICTS: &str = "Conflict resolution";
const FILES: &str = "Files to sync";

/// Handle interactive configuration menu
///
/// Shows all configuration options and allows user to select which ones to modify
pub fn handle_config_interactive() -> Result<()> {
    println!("{}", "Interactive Configuration".cyan().bold());
    println!("{}", "=".repeat(80).cyan());
    println!();

    let current = SyncSettings::load().context("Failed to load current configuration")?;
    print_settings(&current);
    println!();

    let options = vec![
        REPOSITORY,
        BRANCH,
        REPO_PATH,
        DEFAULT_TARGET,
        AUTO_SYNC,
        STARTUP,
        TOKEN,
        CONFLICTS,
        FILES,
    ];

    let selections = MultiSelect::new(
        "Select settings to modify (Space to select, Enter to confirm):",
        options,
    )
    .with_help_message("Use arrow keys to navigate, Space to select/deselect, Enter when done")
    .prompt()
    .context("Failed to get user selections")?;

    if selections.is_empty() {
        println!("{}", "No settings selected. Configuration unchanged.".yellow());
        return Ok(());
    }

    println!();
    let mut modified = current.clone();

    for selection in selections {
        match selection {
            REPOSITORY => {
                let input = Text::new("Repository:")
                    .with_default(&modified.repo_url)
                    .with_help_message("owner/repo, https://github.com/owner/repo or git@github.com:owner/repo.git")
                    .prompt()?;
                modified.set("repo_url", &input)?;
            }
            BRANCH => {
                let input = Text::new("Branch:").with_default(&modified.branch).prompt()?;
                modified.set("branch", &input)?;
            }
            REPO_PATH => {
                let input = Text::new("Path inside the repository:")
                    .with_default(&modified.repo_path)
                    .with_help_message("Directory that mirrors your .cursor folder, empty for the root")
                    .prompt()?;
                modified.set("repo_path", &input)?;
            }
            DEFAULT_TARGET => {
                let choice = Select::new("Default sync target:", vec!["ask", "global", "workspace"])
                    .prompt()?;
                modified.set("default_sync_target", choice)?;
            }
            AUTO_SYNC => {
                let enabled = Confirm::new("Enable auto sync?")
                    .with_default(modified.auto_sync_enabled)
                    .prompt()?;
                modified.set("auto_sync_enabled", &enabled.to_string())?;
                if enabled {
                    let minutes = Text::new("Interval (minutes, 5-1440):")
                        .with_default(&modified.auto_sync_interval_minutes.to_string())
                        .prompt()?;
                    modified.set("auto_sync_interval_minutes", &minutes)?;
                }
            }
            STARTUP => {
                let on_startup = Confirm::new("Pull when starting up?")
                    .with_default(modified.sync_on_startup)
                    .prompt()?;
                let on_new = Confirm::new("Pull into workspaces without a .cursor directory?")
                    .with_default(modified.sync_on_new_workspace)
                    .prompt()?;
                modified.set("sync_on_startup", &on_startup.to_string())?;
                modified.set("sync_on_new_workspace", &on_new.to_string())?;
            }
            TOKEN => {
                let token = Password::new("GitHub token:")
                    .without_confirmation()
                    .with_help_message("Needs contents read/write on the repository; empty to remove")
                    .prompt()?;
                modified.set("github_token", &token)?;
            }
            CONFLICTS => {
                let choice = Select::new(
                    "When a file differs on both sides:",
                    vec!["ask", "keepLocal", "useRemote"],
                )
                .prompt()?;
                modified.set("conflict_resolution", choice)?;
            }
            FILES => {
                let input = Text::new("Files to sync (comma-separated globs):")
                    .with_default(&modified.files_to_sync.join(", "))
                    .with_help_message("Supports *, ** and ?, e.g. .cursor/rules/**")
                    .prompt()?;
                modified.set("files_to_sync", &input)?;
            }
            _ => {}
        }
        println!("  {} {}", "✓".green(), selection);
    }

    println!();
    println!("{}", "New Configuration:".cyan().bold());
    print_settings(&modified);
    println!();

    let confirm = Confirm::new("Save this configuration?")
        .with_default(true)
        .prompt()?;

    if confirm {
        modified.save().context("Failed to save configuration")?;
        println!("\n{} Configuration saved successfully!", "✓".green().bold());
    } else {
        println!("\n{}", "Configuration not saved.".yellow());
    }

    Ok(())
}
