use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use cursor_sync::error::SyncError;
use cursor_sync::sync::{JsonFileStore, SyncTarget};
use cursor_sync::{handlers, interactive_conflict, logger, settings, sync};

#[derive(Parser)]
#[command(name = "cursor-sync")]
#[command(about = "Sync Cursor rules, prompts and MCP configuration with a GitHub repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace folder whose .cursor directory is the workspace target
    /// (default: current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull files from the repository
    Pull {
        /// Target directory (default: default_sync_target setting)
        #[arg(short, long, value_enum)]
        target: Option<SyncTarget>,
    },

    /// Push local files to the repository
    Push {
        /// Target directory (default: default_sync_target setting)
        #[arg(short, long, value_enum)]
        target: Option<SyncTarget>,
    },

    /// Pull into the workspace's .cursor directory
    PullWorkspace,

    /// Pull into ~/.cursor
    PullGlobal,

    /// Show the outcome of the last sync
    Status,

    /// Configure sync settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a value, e.g. --set repo_url=octo/dotfiles (repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Check read and write access to the repository
    Check,

    /// Pull repeatedly on the configured interval
    Watch {
        #[arg(short, long, value_enum)]
        target: Option<SyncTarget>,
    },

    /// Run the pulls configured for startup and new workspaces
    Startup,
}

fn main() -> Result<()> {
    if let Err(e) = logger::init_logger() {
        eprintln!("Warning: Failed to initialize logging: {e:#}");
    }

    let cli = Cli::parse();
    let workspace = cli.workspace.or_else(|| std::env::current_dir().ok());
    let workspace = workspace.as_deref();

    let outcome = match cli.command {
        Commands::Pull { target } => handlers::handle_pull(workspace, target),
        Commands::Push { target } => handlers::handle_push(workspace, target),
        Commands::PullWorkspace => handlers::handle_pull(workspace, Some(SyncTarget::Workspace)),
        Commands::PullGlobal => handlers::handle_pull(workspace, Some(SyncTarget::Global)),
        Commands::Status => JsonFileStore::open_default().and_then(|store| sync::show_status(&store)),
        Commands::Config { show, set } => {
            if show {
                settings::show_config()
            } else if !set.is_empty() {
                settings::update_config(&set)
            } else if interactive_conflict::is_interactive() {
                handlers::handle_config_interactive()
            } else {
                settings::show_config()
            }
        }
        Commands::Check => handlers::handle_check(),
        Commands::Watch { target } => handlers::handle_watch(workspace, target),
        Commands::Startup => handlers::handle_startup(workspace),
    };

    if let Err(e) = &outcome {
        log::error!("{e:#}");
        let is_config_error = e
            .downcast_ref::<SyncError>()
            .is_some_and(SyncError::is_configuration);
        if is_config_error {
            eprintln!("{} {}", "Error:".red().bold(), e);
            eprintln!("  {}", "Run `cursor-sync config` to fix your settings".dimmed());
            std::process::exit(2);
        }
    }

    outcome
}
