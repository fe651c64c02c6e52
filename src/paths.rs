//! Translation between remote sub-path-relative paths and local file paths.
//!
//! Everything maps one-to-one under the sync root except [`RULES_FILE`],
//! which Cursor reads from the directory that contains the sync root.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::config::SYNC_DIR_NAME;

/// The one file that lives beside the sync root rather than inside it.
pub const RULES_FILE: &str = ".cursorrules";

/// Local destination of a remote path.
pub fn to_local(remote_path: &str, sync_root: &Path) -> PathBuf {
    if remote_path == RULES_FILE {
        return rules_file_path(sync_root);
    }

    remote_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(sync_root.to_path_buf(), |path, segment| path.join(segment))
}

/// Remote path of a local file, with forward slashes.
///
/// Fails for a path that is neither the rules file nor under the sync root.
pub fn to_remote(local_path: &Path, sync_root: &Path) -> Result<String> {
    if local_path == rules_file_path(sync_root) {
        return Ok(RULES_FILE.to_string());
    }

    let relative = local_path.strip_prefix(sync_root).with_context(|| {
        format!(
            "{} is outside the sync root {}",
            local_path.display(),
            sync_root.display()
        )
    })?;

    Ok(relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/"))
}

/// `<parent of sync root>/.cursorrules`
pub fn rules_file_path(sync_root: &Path) -> PathBuf {
    sync_root
        .parent()
        .unwrap_or(sync_root)
        .join(RULES_FILE)
}

/// Strip a leading `.cursor/` from each pattern.
///
/// Patterns are written from the workspace's point of view
/// (`.cursor/rules/**`) but matched against paths relative to the sync root,
/// which already sits inside `.cursor`.
pub fn normalize_patterns<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let prefix = format!("{SYNC_DIR_NAME}/");
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref().trim();
            p.strip_prefix(&prefix).unwrap_or(p).to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn root() -> PathBuf {
        PathBuf::from("/home/dev/project").join(SYNC_DIR_NAME)
    }

    #[test]
    fn test_rules_file_maps_beside_root() {
        assert_eq!(
            to_local(RULES_FILE, &root()),
            PathBuf::from("/home/dev/project/.cursorrules")
        );
    }

    #[test]
    fn test_nested_path_maps_under_root() {
        assert_eq!(
            to_local("rules/team/style.mdc", &root()),
            root().join("rules").join("team").join("style.mdc")
        );
    }

    #[rstest]
    #[case(".cursorrules")]
    #[case("mcp.json")]
    #[case("rules/a.mdc")]
    #[case("rules/sub/b.mdc")]
    #[case("prompts/review.md")]
    fn test_round_trip(#[case] remote: &str) {
        let root = root();
        assert_eq!(to_remote(&to_local(remote, &root), &root).unwrap(), remote);
    }

    #[test]
    fn test_outside_root_is_rejected() {
        assert!(to_remote(Path::new("/etc/passwd"), &root()).is_err());
    }

    #[test]
    fn test_normalize_patterns() {
        let normalized = normalize_patterns(&crate::settings::default_files_to_sync());
        assert_eq!(
            normalized,
            vec![".cursorrules", "rules/**", "mcp.json", "prompts/**"]
        );

        assert_eq!(normalize_patterns(&["  ", "docs/*.md"]), vec!["docs/*.md"]);
    }
}
