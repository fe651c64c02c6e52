//! Typed failure classes for sync operations.
//!
//! Most functions in this crate return `anyhow::Result`; the variants below are
//! raised with `bail!`/`Err(..into())` so the orchestrator and tests can tell
//! configuration failures apart from transport failures via `downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

use crate::sync::SyncTarget;

#[derive(Debug, Error)]
pub enum SyncError {
    /// No usable repository identity could be derived from `repo_url`.
    #[error("repository is not configured (expected owner/repo, a GitHub URL or git@host:owner/repo)")]
    NotConfigured,

    /// A workspace-scoped operation ran without a workspace root.
    #[error("no workspace folder is open")]
    MissingWorkspace,

    /// Writing to the remote requires an access token.
    #[error("a GitHub token is required to push (set github_token or GITHUB_TOKEN)")]
    MissingToken,

    /// Push source directory does not exist.
    #[error("sync directory does not exist: {}", .0.display())]
    MissingTargetDirectory(PathBuf),

    /// Another operation holds the lock for this target.
    #[error("a {0} sync is already in progress")]
    SyncInProgress(SyncTarget),

    /// The raw-content endpoint returned a non-success status.
    #[error("fetch failed for {path}: HTTP {status}")]
    FetchFailed { path: String, status: u16 },

    /// The content API returned a non-success status.
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A configuration value is out of range or malformed.
    #[error("invalid setting '{field}': {detail}")]
    InvalidSetting { field: String, detail: String },
}

impl SyncError {
    /// Whether this error belongs to the configuration class that aborts a
    /// whole operation before any file is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured
                | Self::MissingWorkspace
                | Self::MissingToken
                | Self::MissingTargetDirectory(_)
                | Self::InvalidSetting { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = SyncError::FetchFailed {
            path: "rules/a.mdc".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "fetch failed for rules/a.mdc: HTTP 404");

        let err = SyncError::SyncInProgress(SyncTarget::Global);
        assert_eq!(err.to_string(), "a global sync is already in progress");

        let err = SyncError::MissingTargetDirectory(PathBuf::from("/tmp/.cursor"));
        assert!(err.to_string().contains("/tmp/.cursor"));
    }

    #[test]
    fn test_configuration_class() {
        assert!(SyncError::MissingToken.is_configuration());
        assert!(SyncError::NotConfigured.is_configuration());
        assert!(!SyncError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_configuration());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = SyncError::MissingToken.into();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::MissingToken)
        ));
    }
}
