use anyhow::Result;
use colored::{ColoredString, Colorize};

use super::state::{PersistedSyncState, StateStore};

/// Coarse sync status shown next to every command's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    Idle,
    Syncing,
    Success,
    Error,
}

impl SyncIndicator {
    /// Status at rest, derived from the last recorded sync.
    pub fn from_state(state: &PersistedSyncState) -> Self {
        if state.last_error.is_some() {
            SyncIndicator::Error
        } else if state.last_synced_at.is_some() {
            SyncIndicator::Success
        } else {
            SyncIndicator::Idle
        }
    }

    pub fn label(&self) -> ColoredString {
        match self {
            SyncIndicator::Idle => "idle".dimmed(),
            SyncIndicator::Syncing => "syncing".cyan(),
            SyncIndicator::Success => "synced".green(),
            SyncIndicator::Error => "error".red(),
        }
    }
}

/// Print the status detail view
pub fn show_status(store: &dyn StateStore) -> Result<()> {
    let state = PersistedSyncState::load(store)?;

    println!("{}", "=== Cursor Sync Status ===".bold().cyan());
    println!();
    println!("  Status: {}", SyncIndicator::from_state(&state).label());

    match state.last_synced_at {
        Some(at) => println!(
            "  Last sync: {}",
            at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("  Last sync: {}", "never".yellow()),
    }
    if let Some(target) = state.last_sync_target {
        println!("  Target: {}", target.to_string().cyan());
    }
    if let Some(direction) = state.last_sync_direction {
        println!("  Direction: {}", direction.as_str().cyan());
    }

    if !state.last_sync_files.is_empty() {
        println!();
        println!("{}", "Files:".bold());
        for file in &state.last_sync_files {
            println!("  {file}");
        }
    }

    if let Some(error) = &state.last_error {
        println!();
        println!("{}", "Last error:".bold().red());
        for part in error.split("; ") {
            println!("  {}", part.red());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MemoryStore;

    #[test]
    fn test_indicator_from_state() {
        let mut state = PersistedSyncState::default();
        assert_eq!(SyncIndicator::from_state(&state), SyncIndicator::Idle);

        state.last_synced_at = Some(chrono::Utc::now());
        assert_eq!(SyncIndicator::from_state(&state), SyncIndicator::Success);

        state.last_error = Some("mcp.json: HTTP 500".into());
        assert_eq!(SyncIndicator::from_state(&state), SyncIndicator::Error);
    }

    #[test]
    fn test_show_status_on_empty_store() {
        assert!(show_status(&MemoryStore::new()).is_ok());
    }
}
