mod lock;
mod pull;
mod push;
mod state;
mod status;

pub use lock::TargetLock;
pub use pull::{pull, pull_with_remote};
pub use push::{push, push_with_remote};
pub use state::{JsonFileStore, MemoryStore, PersistedSyncState, StateStore, STATE_KEY};
pub use status::{show_status, SyncIndicator};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{ConfigManager, SYNC_DIR_NAME};
use crate::conflict::{Conflict, ConflictResolver, SyncDirection};
use crate::error::SyncError;
use crate::settings::SyncConfig;

/// Which local directory a sync run mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncTarget {
    /// `~/.cursor`
    Global,
    /// `<workspace>/.cursor`
    Workspace,
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncTarget::Global => "global",
            SyncTarget::Workspace => "workspace",
        })
    }
}

/// Local sync roots available to this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRoots {
    pub global: PathBuf,
    pub workspace: Option<PathBuf>,
}

impl SyncRoots {
    /// `~/.cursor` plus `<workspace>/.cursor` when a workspace is open.
    pub fn detect(workspace: Option<&Path>) -> Result<Self> {
        Ok(SyncRoots {
            global: ConfigManager::global_sync_dir()?,
            workspace: workspace.map(|w| w.join(SYNC_DIR_NAME)),
        })
    }

    pub fn root_for(&self, target: SyncTarget) -> Result<&Path> {
        match target {
            SyncTarget::Global => Ok(self.global.as_path()),
            SyncTarget::Workspace => self
                .workspace
                .as_deref()
                .ok_or_else(|| SyncError::MissingWorkspace.into()),
        }
    }
}

/// Aggregated outcome of one pull or push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// True exactly when `errors` is empty
    pub success: bool,
    pub files_processed: usize,
    /// `"<path>: <error>"` per failed file, or the single setup error
    pub errors: Vec<String>,
    pub conflicts: Vec<Conflict>,
    /// Set when setup failed and no file was looked at
    #[serde(skip)]
    pub aborted: bool,
}

impl SyncResult {
    fn failed_setup(err: &anyhow::Error) -> Self {
        SyncResult {
            success: false,
            files_processed: 0,
            errors: vec![format!("{err:#}")],
            conflicts: Vec::new(),
            aborted: true,
        }
    }

    fn record_file_error(&mut self, path: &str, err: &anyhow::Error) {
        log::warn!("{path}: {err:#}");
        self.errors.push(format!("{path}: {err:#}"));
    }

    fn finish(mut self) -> Self {
        self.success = self.errors.is_empty();
        self
    }

    /// The error list as stored in `lastError`
    pub fn joined_errors(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| self.errors.join("; "))
    }
}

/// Everything a pull or push needs besides the remote.
pub struct SyncContext<'a> {
    pub config: &'a SyncConfig,
    pub roots: &'a SyncRoots,
    pub state: &'a dyn StateStore,
    pub resolver: &'a ConflictResolver<'a>,
    /// Where per-target lock files live; `None` runs unguarded
    pub lock_dir: Option<&'a Path>,
}

impl SyncContext<'_> {
    fn lock(&self, target: SyncTarget) -> Result<Option<TargetLock>> {
        self.lock_dir
            .map(|dir| TargetLock::acquire(dir, target))
            .transpose()
    }

    /// Setup failed: report one error and record only that error.
    fn abort(&self, direction: SyncDirection, err: anyhow::Error) -> SyncResult {
        log::error!("{} aborted: {err:#}", direction.as_str());
        let result = SyncResult::failed_setup(&err);
        if let Err(e) = PersistedSyncState::update(self.state, |s| {
            s.last_error = result.joined_errors();
        }) {
            log::warn!("Failed to persist sync state: {e:#}");
        }
        result
    }

    /// The per-file loop ran: record the complete outcome.
    fn record(
        &self,
        target: SyncTarget,
        direction: SyncDirection,
        files: Vec<String>,
        result: SyncResult,
    ) -> SyncResult {
        let result = result.finish();
        let saved = PersistedSyncState::update(self.state, |s| {
            s.last_synced_at = Some(chrono::Utc::now());
            s.last_sync_target = Some(target);
            s.last_sync_direction = Some(direction);
            s.last_sync_files = files;
            s.last_error = result.joined_errors();
        });
        if let Err(e) = saved {
            log::warn!("Failed to persist sync state: {e:#}");
        }

        log::info!(
            "{} {target}: {} files, {} conflicts, {} errors",
            direction.as_str(),
            result.files_processed,
            result.conflicts.len(),
            result.errors.len()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_requires_workspace() {
        let roots = SyncRoots {
            global: PathBuf::from("/home/dev/.cursor"),
            workspace: None,
        };
        assert_eq!(
            roots.root_for(SyncTarget::Global).unwrap(),
            Path::new("/home/dev/.cursor")
        );
        let err = roots.root_for(SyncTarget::Workspace).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::MissingWorkspace)
        ));
    }

    #[test]
    fn test_detect_joins_sync_dir() {
        let roots = SyncRoots::detect(Some(Path::new("/work/app"))).unwrap();
        assert_eq!(roots.workspace, Some(PathBuf::from("/work/app/.cursor")));
        assert!(roots.global.ends_with(".cursor"));
    }

    #[test]
    fn test_success_tracks_errors() {
        let mut result = SyncResult {
            files_processed: 3,
            ..Default::default()
        };
        assert!(result.clone().finish().success);

        result.record_file_error("mcp.json", &anyhow::anyhow!("disk full"));
        let result = result.finish();
        assert!(!result.success);
        assert_eq!(result.errors, vec!["mcp.json: disk full"]);
        assert_eq!(result.joined_errors().as_deref(), Some("mcp.json: disk full"));
    }

    #[test]
    fn test_setup_failure_shape() {
        let result = SyncResult::failed_setup(&anyhow::Error::from(SyncError::MissingToken));
        assert!(!result.success);
        assert_eq!(result.files_processed, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.conflicts.is_empty());
        assert!(result.aborted);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(SyncTarget::Global.to_string(), "global");
        assert_eq!(SyncTarget::Workspace.to_string(), "workspace");
    }
}
