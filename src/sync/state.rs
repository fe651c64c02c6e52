use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use super::SyncTarget;
use crate::conflict::SyncDirection;

/// Key the sync state is stored under.
pub const STATE_KEY: &str = "syncState";

/// Persisted key-value storage that survives process restarts.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Outcome of the most recent sync, as shown by `cursor-sync status`.
///
/// Every field is empty on first use. A sync that fails during setup only
/// touches `last_error`; any other completed sync rewrites all fields, and
/// clears `last_error` when it had no errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSyncState {
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_target: Option<SyncTarget>,
    pub last_sync_direction: Option<SyncDirection>,
    pub last_sync_files: Vec<String>,
    pub last_error: Option<String>,
}

impl PersistedSyncState {
    /// Load from `store`, or the empty state when nothing was saved yet.
    pub fn load(store: &dyn StateStore) -> Result<Self> {
        match store.get(STATE_KEY)? {
            Some(value) => serde_json::from_value(value).context("Failed to parse sync state"),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, store: &dyn StateStore) -> Result<()> {
        let value = serde_json::to_value(self).context("Failed to serialize sync state")?;
        store.set(STATE_KEY, value)
    }

    /// Read-modify-write of the stored state.
    pub fn update(store: &dyn StateStore, apply: impl FnOnce(&mut Self)) -> Result<Self> {
        let mut state = Self::load(store)?;
        apply(&mut state);
        state.save(store)?;
        Ok(state)
    }
}

/// Stores every key of one JSON object in a file (`state.json`).
///
/// Each call rereads the file so separate processes see each other's writes;
/// the last writer wins.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    /// Store in the default location inside the config directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::ConfigManager::state_file_path()?))
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(&all).context("Failed to serialize state file")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))
    }
}

/// In-process store, for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("state store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("state store lock poisoned"))?
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_state_when_empty() {
        let store = MemoryStore::new();
        let state = PersistedSyncState::load(&store).unwrap();
        assert_eq!(state, PersistedSyncState::default());
        assert!(state.last_synced_at.is_none());
        assert!(state.last_sync_files.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let state = PersistedSyncState {
            last_synced_at: None,
            last_sync_target: Some(SyncTarget::Workspace),
            last_sync_direction: Some(SyncDirection::Pull),
            last_sync_files: vec!["mcp.json".into()],
            last_error: None,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["lastSyncTarget"], "workspace");
        assert_eq!(value["lastSyncDirection"], "pull");
        assert_eq!(value["lastSyncFiles"][0], "mcp.json");
        assert!(value["lastSyncedAt"].is_null());
        assert!(value["lastError"].is_null());
    }

    #[test]
    fn test_update_preserves_other_fields() {
        let store = MemoryStore::new();
        PersistedSyncState {
            last_sync_files: vec!["rules/a.mdc".into()],
            last_sync_direction: Some(SyncDirection::Push),
            ..Default::default()
        }
        .save(&store)
        .unwrap();

        PersistedSyncState::update(&store, |s| s.last_error = Some("boom".into())).unwrap();

        let state = PersistedSyncState::load(&store).unwrap();
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        assert_eq!(state.last_sync_files, vec!["rules/a.mdc"]);
        assert_eq!(state.last_sync_direction, Some(SyncDirection::Push));
    }

    #[test]
    fn test_json_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = JsonFileStore::new(&path);
        store.set("other", serde_json::json!({"keep": true})).unwrap();
        PersistedSyncState::update(&store, |s| s.last_sync_target = Some(SyncTarget::Global))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let state = PersistedSyncState::load(&reopened).unwrap();
        assert_eq!(state.last_sync_target, Some(SyncTarget::Global));
        assert_eq!(
            reopened.get("other").unwrap(),
            Some(serde_json::json!({"keep": true}))
        );
    }
}
