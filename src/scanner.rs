use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::paths::{self, RULES_FILE};
use crate::pattern::PatternSet;

/// Local files selected for push.
///
/// Keys are forward-slash paths relative to the sync root, except for the
/// rules file beside the root, which is keyed as `.cursorrules`.
#[derive(Debug, Default)]
pub struct LocalFiles {
    pub files: BTreeMap<String, String>,
    /// Selected files that could not be read as UTF-8 text.
    pub unreadable: Vec<(String, anyhow::Error)>,
}

impl LocalFiles {
    fn read(&mut self, key: String, path: &Path) {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
        match content {
            Ok(content) => {
                self.files.insert(key, content);
            }
            Err(e) => {
                log::warn!("{key}: {e:#}");
                self.unreadable.push((key, e));
            }
        }
    }

    /// Every selected path, readable or not.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .keys()
            .cloned()
            .chain(self.unreadable.iter().map(|(path, _)| path.clone()))
            .collect();
        paths.sort();
        paths
    }
}

/// Collect the local files selected by `patterns`.
///
/// A missing root yields whatever the rules file contributes. Symlinks are
/// followed.
pub fn collect<S: AsRef<str>>(sync_root: &Path, patterns: &[S]) -> Result<LocalFiles> {
    let patterns = PatternSet::new(&paths::normalize_patterns(patterns))?;
    let mut local = LocalFiles::default();

    if patterns.is_empty() {
        return Ok(local);
    }

    let rules_file = paths::rules_file_path(sync_root);
    if patterns.is_match(RULES_FILE) && rules_file.is_file() {
        local.read(RULES_FILE.to_string(), &rules_file);
    }

    if !sync_root.is_dir() {
        log::debug!("Sync root {} does not exist, nothing to scan", sync_root.display());
        return Ok(local);
    }

    let walker = WalkDir::new(sync_root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            paths::to_remote(entry.path(), sync_root)
                .map(|dir| patterns.could_contain_match(&dir))
                .unwrap_or(false)
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let selected = e
                    .path()
                    .and_then(|path| paths::to_remote(path, sync_root).ok())
                    .filter(|relative| relative != RULES_FILE && patterns.is_match(relative));
                match selected {
                    Some(relative) => {
                        log::warn!("{relative}: {e}");
                        local.unreadable.push((relative, e.into()));
                    }
                    None => {
                        log::warn!("Skipping unreadable entry under {}: {}", sync_root.display(), e)
                    }
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            if !entry.file_type().is_dir() {
                log::debug!("Skipping {}: not a regular file", entry.path().display());
            }
            continue;
        }

        let relative = paths::to_remote(entry.path(), sync_root)?;
        // shadowed by the real rules file one level up
        if relative == RULES_FILE || !patterns.is_match(&relative) {
            continue;
        }

        local.read(relative, entry.path());
    }

    log::debug!(
        "Collected {} local files from {} ({} unreadable)",
        local.files.len(),
        sync_root.display(),
        local.unreadable.len()
    );
    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::default_files_to_sync;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collects_matching_files_and_rules_file() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join(".cursor");

        write(workspace.path().join(".cursorrules"), "be terse");
        write(root.join("rules/a.mdc"), "A");
        write(root.join("rules/team/b.mdc"), "B");
        write(root.join("mcp.json"), "{}");
        write(root.join("prompts/review.md"), "review");
        write(root.join("extensions/ignored.json"), "[]");
        write(root.join("settings.json"), "{}");

        let files = collect(&root, &default_files_to_sync()).unwrap().files;
        let keys: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                ".cursorrules",
                "mcp.json",
                "prompts/review.md",
                "rules/a.mdc",
                "rules/team/b.mdc"
            ]
        );
        assert_eq!(files[".cursorrules"], "be terse");
        assert_eq!(files["rules/team/b.mdc"], "B");
    }

    #[test]
    fn test_missing_root_is_not_an_error() {
        let workspace = TempDir::new().unwrap();
        let files = collect(&workspace.path().join(".cursor"), &default_files_to_sync())
            .unwrap()
            .files;
        assert!(files.is_empty());
    }

    #[test]
    fn test_rules_file_found_without_root() {
        let workspace = TempDir::new().unwrap();
        write(workspace.path().join(".cursorrules"), "X");

        let files = collect(&workspace.path().join(".cursor"), &default_files_to_sync())
            .unwrap()
            .files;
        assert_eq!(files.len(), 1);
        assert_eq!(files[".cursorrules"], "X");
    }

    #[test]
    fn test_rules_file_respects_patterns() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join(".cursor");
        write(workspace.path().join(".cursorrules"), "X");
        write(root.join("mcp.json"), "{}");

        let files = collect(&root, &[".cursor/mcp.json"]).unwrap().files;
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["mcp.json"]);
    }

    #[test]
    fn test_empty_pattern_list_collects_nothing() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join(".cursor");
        write(root.join("mcp.json"), "{}");

        let local = collect::<&str>(&root, &[]).unwrap();
        assert!(local.files.is_empty());
        assert!(local.unreadable.is_empty());
    }

    #[test]
    fn test_non_utf8_file_is_reported_unreadable() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join(".cursor");
        write(root.join("prompts/ok.md"), "ok");
        fs::write(root.join("prompts/latin1.md"), [0x63, 0x61, 0x66, 0xE9]).unwrap();

        let local = collect(&root, &default_files_to_sync()).unwrap();
        assert_eq!(local.files.keys().collect::<Vec<_>>(), vec!["prompts/ok.md"]);
        assert_eq!(local.unreadable.len(), 1);
        assert_eq!(local.unreadable[0].0, "prompts/latin1.md");
        assert_eq!(local.paths(), vec!["prompts/latin1.md", "prompts/ok.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_rule_is_collected() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join(".cursor");
        let shared = workspace.path().join("shared.mdc");
        write(shared.clone(), "shared rule");
        fs::create_dir_all(root.join("rules")).unwrap();
        std::os::unix::fs::symlink(&shared, root.join("rules/shared.mdc")).unwrap();

        let local = collect(&root, &default_files_to_sync()).unwrap();
        assert_eq!(local.files["rules/shared.mdc"], "shared rule");
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_reported_unreadable() {
        let workspace = TempDir::new().unwrap();
        let root = workspace.path().join(".cursor");
        fs::create_dir_all(root.join("rules")).unwrap();
        std::os::unix::fs::symlink(workspace.path().join("gone.mdc"), root.join("rules/gone.mdc"))
            .unwrap();

        let local = collect(&root, &default_files_to_sync()).unwrap();
        assert!(local.files.is_empty());
        assert_eq!(local.paths(), vec!["rules/gone.mdc"]);
    }
}
