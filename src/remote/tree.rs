use anyhow::Result;
use std::collections::BTreeMap;

use super::{EntryKind, RemoteStore};
use crate::pattern::PatternSet;

/// Fetch every remote file under the sub-path whose path matches `patterns`.
///
/// Directories are descended whenever a pattern could still match below
/// them. A file that fails to download is logged and left out; a listing
/// failure aborts the traversal.
pub fn fetch_all_matching<R: RemoteStore + ?Sized>(
    remote: &R,
    patterns: &PatternSet,
) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    if patterns.is_empty() {
        return Ok(files);
    }

    let mut pending = vec![String::new()];
    while let Some(dir) = pending.pop() {
        for entry in remote.list_directory(&dir)? {
            match entry.kind {
                EntryKind::Dir => {
                    if patterns.could_contain_match(&entry.path) {
                        pending.push(entry.path);
                    } else {
                        log::debug!("Skipping remote directory {}", entry.path);
                    }
                }
                EntryKind::File if patterns.is_match(&entry.path) => {
                    match remote.fetch_raw(&entry.path) {
                        Ok(content) => {
                            files.insert(entry.path, content);
                        }
                        Err(e) => log::warn!("Failed to fetch {}: {e:#}", entry.path),
                    }
                }
                _ => {}
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{AccessInfo, RemoteEntry, RemoteFileContent};
    use crate::error::SyncError;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Directory tree held in memory; `broken` files fail to download.
    #[derive(Default)]
    struct TreeStore {
        files: BTreeMap<String, String>,
        broken: HashSet<String>,
        listed: RefCell<Vec<String>>,
    }

    impl TreeStore {
        fn with(files: &[(&str, &str)]) -> Self {
            TreeStore {
                files: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    fn entry(path: &str, kind: EntryKind) -> RemoteEntry {
        RemoteEntry {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            revision_id: "sha".into(),
            size_bytes: 0,
            kind,
            raw_content_url: None,
        }
    }

    impl RemoteStore for TreeStore {
        fn list_directory(&self, dir: &str) -> Result<Vec<RemoteEntry>> {
            self.listed.borrow_mut().push(dir.to_string());
            let prefix = if dir.is_empty() {
                String::new()
            } else {
                format!("{dir}/")
            };
            let mut seen = HashSet::new();
            let mut entries = Vec::new();
            for path in self.files.keys() {
                let Some(rest) = path.strip_prefix(&prefix) else {
                    continue;
                };
                match rest.split_once('/') {
                    Some((child, _)) => {
                        if seen.insert(child.to_string()) {
                            entries.push(entry(&format!("{prefix}{child}"), EntryKind::Dir));
                        }
                    }
                    None => entries.push(entry(path, EntryKind::File)),
                }
            }
            Ok(entries)
        }

        fn fetch_raw(&self, path: &str) -> Result<String> {
            if self.broken.contains(path) {
                return Err(SyncError::FetchFailed {
                    path: path.into(),
                    status: 500,
                }
                .into());
            }
            Ok(self.files[path].clone())
        }

        fn fetch_with_revision(&self, _path: &str) -> Result<RemoteFileContent> {
            unimplemented!()
        }

        fn push(&self, _path: &str, _content: &str, _message: &str) -> Result<()> {
            unimplemented!()
        }

        fn check_access(&self) -> AccessInfo {
            AccessInfo::default()
        }

        fn has_token(&self) -> bool {
            false
        }
    }

    fn default_patterns() -> PatternSet {
        PatternSet::new(&[".cursorrules", "rules/**", "mcp.json", "prompts/**"]).unwrap()
    }

    #[test]
    fn test_collects_matching_files_recursively() {
        let store = TreeStore::with(&[
            ("rules/a.mdc", "A"),
            ("rules/nested/b.mdc", "B"),
            ("mcp.json", "{}"),
            ("README.md", "ignored"),
            ("other/c.mdc", "ignored"),
        ]);

        let files = fetch_all_matching(&store, &default_patterns()).unwrap();
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["mcp.json", "rules/a.mdc", "rules/nested/b.mdc"]);
        assert_eq!(files["rules/nested/b.mdc"], "B");

        // directories that cannot match are never listed
        assert!(!store.listed.borrow().contains(&"other".to_string()));
    }

    #[test]
    fn test_failed_file_is_omitted() {
        let mut store = TreeStore::with(&[("rules/a.mdc", "A"), ("mcp.json", "{}")]);
        store.broken.insert("mcp.json".into());

        let files = fetch_all_matching(&store, &default_patterns()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("rules/a.mdc"));
    }

    #[test]
    fn test_empty_tree_and_empty_patterns() {
        let store = TreeStore::default();
        assert!(fetch_all_matching(&store, &default_patterns()).unwrap().is_empty());

        let store = TreeStore::with(&[("mcp.json", "{}")]);
        let none = PatternSet::new::<&str>(&[]).unwrap();
        assert!(fetch_all_matching(&store, &none).unwrap().is_empty());
        assert!(store.listed.borrow().is_empty());
    }
}
