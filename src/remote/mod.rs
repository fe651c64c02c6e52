//! Access to the file tree stored under one branch of a GitHub repository.
//!
//! [`RemoteStore`] is the seam the sync engine talks to; [`GitHubClient`]
//! implements it over the REST contents API, and tests substitute an
//! in-memory store. Every path crossing this seam is relative to the
//! configured repository sub-path.

mod client;
mod tree;

pub use client::GitHubClient;
pub use tree::fetch_all_matching;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Kind of node in a directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks and submodules are listed but never synced
    #[serde(other)]
    Other,
}

/// One node of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// Sub-path-relative once returned by [`RemoteStore::list_directory`]
    pub path: String,
    #[serde(rename = "sha")]
    pub revision_id: String,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "download_url", default)]
    pub raw_content_url: Option<String>,
}

/// File content together with the revision it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileContent {
    pub path: String,
    pub content: String,
    /// Required when updating; `None` means the file is being created
    pub revision_id: Option<String>,
}

/// What the configured credentials allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccessInfo {
    pub can_read: bool,
    pub can_write: bool,
}

pub trait RemoteStore {
    /// List one directory level; a missing directory lists as empty.
    fn list_directory(&self, relative_path: &str) -> Result<Vec<RemoteEntry>>;

    /// Fetch file content through the anonymous raw-content endpoint.
    fn fetch_raw(&self, relative_path: &str) -> Result<String>;

    /// Fetch file content and its current revision identifier.
    fn fetch_with_revision(&self, relative_path: &str) -> Result<RemoteFileContent>;

    /// Create or update a file on the configured branch.
    fn push(&self, relative_path: &str, content: &str, commit_message: &str) -> Result<()>;

    fn check_access(&self) -> AccessInfo;

    fn has_token(&self) -> bool;
}

/// Join the sub-path prefix and a relative path, collapsing repeated slashes
/// and dropping leading and trailing ones.
pub fn normalize_remote_path(prefix: &str, relative_path: &str) -> String {
    format!("{prefix}/{relative_path}")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether an error means "the remote has no such file".
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::Api { status: 404, .. }) | Some(SyncError::FetchFailed { status: 404, .. })
    )
}
