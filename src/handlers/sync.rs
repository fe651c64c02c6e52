//! Sync command handlers
//!
//! Loads settings, picks the target and the conflict prompt for the current
//! terminal, runs the orchestrator and prints the outcome.

use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{InquireError, Select};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ConfigManager;
use crate::conflict::{ConflictResolver, DocumentViewer, NoPrompt, SyncDirection, UserChoicePrompt};
use crate::interactive_conflict::{self, TerminalPrompt, TerminalViewer};
use crate::logger;
use crate::remote::{GitHubClient, RemoteStore};
use crate::scheduler::AutoSyncHandle;
use crate::settings::{DefaultTarget, SyncConfig, SyncSettings};
use crate::sync::{
    self, JsonFileStore, SyncContext, SyncIndicator, SyncResult, SyncRoots, SyncTarget,
};

/// Resolved settings plus the local environment of one command.
struct Session {
    settings: SyncSettings,
    config: SyncConfig,
    roots: SyncRoots,
    store: JsonFileStore,
    lock_dir: PathBuf,
}

impl Session {
    fn open(workspace: Option<&Path>) -> Result<Self> {
        let settings = SyncSettings::load()?;
        let config = settings.resolve()?;
        Ok(Session {
            roots: SyncRoots::detect(workspace)?,
            store: JsonFileStore::open_default()?,
            lock_dir: ConfigManager::locks_dir()?,
            settings,
            config,
        })
    }

    fn run(&self, direction: SyncDirection, target: SyncTarget) -> SyncResult {
        let (prompt, viewer) = terminal_prompt();
        let resolver = ConflictResolver::new(self.config.conflict_policy, prompt, viewer);
        let ctx = SyncContext {
            config: &self.config,
            roots: &self.roots,
            state: &self.store,
            resolver: &resolver,
            lock_dir: Some(&self.lock_dir),
        };

        println!(
            "{} {} {}",
            SyncIndicator::Syncing.label(),
            direction.as_str(),
            target.to_string().cyan()
        );
        let result = match direction {
            SyncDirection::Pull => sync::pull(&ctx, target),
            SyncDirection::Push => sync::push(&ctx, target),
        };

        if let Err(e) = logger::log_to_file(&format!(
            "{} {}: success={} files={} conflicts={} errors={}",
            direction.as_str(),
            target,
            result.success,
            result.files_processed,
            result.conflicts.len(),
            result.errors.len()
        )) {
            log::warn!("Failed to write log file: {e:#}");
        }
        result
    }
}

/// Interactive prompts on a terminal, otherwise a prompt that always skips.
fn terminal_prompt() -> (&'static dyn UserChoicePrompt, &'static dyn DocumentViewer) {
    if interactive_conflict::is_interactive() {
        let prompt: &'static dyn UserChoicePrompt = &TerminalPrompt;
        let viewer: &'static dyn DocumentViewer = &TerminalViewer;
        (prompt, viewer)
    } else {
        let prompt: &'static dyn UserChoicePrompt = &NoPrompt;
        let viewer: &'static dyn DocumentViewer = &NoPrompt;
        (prompt, viewer)
    }
}

/// Decide which target to sync.
///
/// `None` means the user dismissed the choice and the command is cancelled.
/// Without a terminal to ask on, `ask` falls back to the workspace when one
/// is open and to the global directory otherwise.
pub fn choose_target(
    explicit: Option<SyncTarget>,
    default: DefaultTarget,
    roots: &SyncRoots,
) -> Result<Option<SyncTarget>> {
    if let Some(target) = explicit {
        return Ok(Some(target));
    }

    match default {
        DefaultTarget::Global => Ok(Some(SyncTarget::Global)),
        DefaultTarget::Workspace => Ok(Some(SyncTarget::Workspace)),
        DefaultTarget::Ask if !interactive_conflict::is_interactive() => {
            let target = if roots.workspace.is_some() {
                SyncTarget::Workspace
            } else {
                SyncTarget::Global
            };
            log::info!("No terminal to ask on, using the {target} target");
            Ok(Some(target))
        }
        DefaultTarget::Ask => {
            let mut options = vec![format!("Global ({})", roots.global.display())];
            if let Some(workspace) = &roots.workspace {
                options.push(format!("Workspace ({})", workspace.display()));
            }

            let answer = Select::new("Sync which Cursor directory?", options)
                .with_help_message("Esc to cancel")
                .prompt_skippable();

            match answer {
                Ok(Some(choice)) if choice.starts_with("Global") => Ok(Some(SyncTarget::Global)),
                Ok(Some(_)) => Ok(Some(SyncTarget::Workspace)),
                Ok(None) | Err(InquireError::NotTTY) => Ok(None),
                Err(e) => Err(e).context("Failed to choose a sync target"),
            }
        }
    }
}

/// Print the result of a pull or push.
///
/// Returns an error when the sync did not succeed so the process exits
/// non-zero.
pub fn report(direction: SyncDirection, target: SyncTarget, result: &SyncResult) -> Result<()> {
    let verb = match direction {
        SyncDirection::Pull => "Pulled",
        SyncDirection::Push => "Pushed",
    };

    if result.aborted {
        let error = result.errors.first().map(String::as_str).unwrap_or("unknown error");
        println!("{} {}", SyncIndicator::Error.label(), error.red());
        println!(
            "  {}",
            "Run `cursor-sync config` to review your settings".dimmed()
        );
        anyhow::bail!("{} {target} failed", direction.as_str());
    }

    println!(
        "{} {verb} {} file(s) for {}",
        if result.success {
            SyncIndicator::Success.label()
        } else {
            SyncIndicator::Error.label()
        },
        result.files_processed.to_string().cyan(),
        target.to_string().cyan()
    );

    for conflict in &result.conflicts {
        println!("  {} {}", "!".yellow(), conflict.description());
    }

    if let Some(first) = result.errors.first() {
        println!("  {} {}", "✗".red(), first.red());
        if result.errors.len() > 1 {
            println!("  ... and {} more", result.errors.len() - 1);
        }
        println!("  {}", "Run `cursor-sync status` for details".dimmed());
        anyhow::bail!("{} {target} finished with errors", direction.as_str());
    }

    Ok(())
}

/// `pull`, `pull-global` and `pull-workspace`
pub fn handle_pull(workspace: Option<&Path>, target: Option<SyncTarget>) -> Result<()> {
    handle_sync(SyncDirection::Pull, workspace, target)
}

/// `push`
pub fn handle_push(workspace: Option<&Path>, target: Option<SyncTarget>) -> Result<()> {
    handle_sync(SyncDirection::Push, workspace, target)
}

fn handle_sync(
    direction: SyncDirection,
    workspace: Option<&Path>,
    target: Option<SyncTarget>,
) -> Result<()> {
    let session = Session::open(workspace)?;

    let Some(target) = choose_target(target, session.settings.default_sync_target, &session.roots)?
    else {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    };

    let result = session.run(direction, target);
    report(direction, target, &result)
}

/// `check`: print what the configured credentials allow
pub fn handle_check() -> Result<()> {
    let config = SyncSettings::load()?.resolve()?;
    let client = GitHubClient::new(&config)?;

    println!("{} {}", "Repository:".bold(), client.repository().to_string().cyan());
    println!("  Branch: {}", config.branch);
    println!("  Path: {}", config.repo_path);

    let access = client.check_access();
    let yes_no = |ok: bool| if ok { "yes".green() } else { "no".red() };
    println!("  Read: {}", yes_no(access.can_read));
    println!("  Write: {}", yes_no(access.can_write));

    if !client.has_token() {
        println!(
            "  {}",
            "No token configured; set github_token or GITHUB_TOKEN to push".yellow()
        );
    }
    Ok(())
}

/// `startup`: run the pulls configured for editor startup.
pub fn handle_startup(workspace: Option<&Path>) -> Result<()> {
    let session = Session::open(workspace)?;
    let mut workspace_pulled = false;

    if session.settings.sync_on_startup {
        if let Some(target) =
            choose_target(None, session.settings.default_sync_target, &session.roots)?
        {
            let result = session.run(SyncDirection::Pull, target);
            report(SyncDirection::Pull, target, &result)?;
            workspace_pulled = target == SyncTarget::Workspace;
        }
    }

    // a workspace without .cursor has never been synced
    let new_workspace = session
        .roots
        .workspace
        .as_deref()
        .is_some_and(|root| !root.exists());
    if session.settings.sync_on_new_workspace && new_workspace && !workspace_pulled {
        println!("{}", "New workspace detected".cyan());
        let result = session.run(SyncDirection::Pull, SyncTarget::Workspace);
        report(SyncDirection::Pull, SyncTarget::Workspace, &result)?;
    }

    Ok(())
}

/// `watch`: pull on the configured interval until interrupted.
pub fn handle_watch(workspace: Option<&Path>, target: Option<SyncTarget>) -> Result<()> {
    let session = Session::open(workspace)?;
    if !session.settings.auto_sync_enabled {
        println!(
            "{}",
            "auto_sync_enabled is off; watching anyway for this session".yellow()
        );
    }

    let Some(target) = choose_target(target, session.settings.default_sync_target, &session.roots)?
    else {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    };

    let minutes = session.settings.auto_sync_interval_minutes;
    println!(
        "{} every {} minute(s), press Ctrl+C to stop",
        format!("Pulling {target}").cyan().bold(),
        minutes
    );

    let handle = AutoSyncHandle::start(Duration::from_secs(u64::from(minutes) * 60), move || {
        let result = session.run(SyncDirection::Pull, target);
        if let Err(e) = report(SyncDirection::Pull, target, &result) {
            log::warn!("{e:#}");
        }
    })?;
    handle.wait();

    Ok(())
}
