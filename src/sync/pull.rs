use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conflict::{Conflict, ConflictResolution, SyncDirection};
use crate::paths;
use crate::pattern::PatternSet;
use crate::remote::{fetch_all_matching, GitHubClient, RemoteStore};

use super::{SyncContext, SyncResult, SyncTarget, TargetLock};

/// Pull the configured files from GitHub into the target's sync root.
pub fn pull(ctx: &SyncContext, target: SyncTarget) -> SyncResult {
    match GitHubClient::new(ctx.config) {
        Ok(client) => pull_with_remote(ctx, &client, target),
        Err(e) => ctx.abort(SyncDirection::Pull, e),
    }
}

/// Pull through any [`RemoteStore`].
///
/// The sync root is created if missing. A local file that differs from the
/// remote one is a conflict and is overwritten only when resolved to
/// `useRemote`. Failures for single files are collected and the loop moves on.
pub fn pull_with_remote<R: RemoteStore + ?Sized>(
    ctx: &SyncContext,
    remote: &R,
    target: SyncTarget,
) -> SyncResult {
    log::info!("Pulling into {target} sync root");

    let (_lock, sync_root, remote_files) = match prepare(ctx, remote, target) {
        Ok(prepared) => prepared,
        Err(e) => return ctx.abort(SyncDirection::Pull, e),
    };

    let mut result = SyncResult::default();
    for (path, content) in &remote_files {
        match pull_file(ctx, &sync_root, path, content) {
            Ok(conflict) => {
                result.files_processed += 1;
                result.conflicts.extend(conflict);
            }
            Err(e) => result.record_file_error(path, &e),
        }
    }

    let considered = remote_files.into_keys().collect();
    ctx.record(target, SyncDirection::Pull, considered, result)
}

type Prepared = (Option<TargetLock>, PathBuf, BTreeMap<String, String>);

fn prepare<R: RemoteStore + ?Sized>(
    ctx: &SyncContext,
    remote: &R,
    target: SyncTarget,
) -> Result<Prepared> {
    ctx.config.repository()?;
    let sync_root = ctx.roots.root_for(target)?.to_path_buf();
    let lock = ctx.lock(target)?;

    fs::create_dir_all(&sync_root)
        .with_context(|| format!("Failed to create {}", sync_root.display()))?;

    let patterns = PatternSet::new(&paths::normalize_patterns(&ctx.config.patterns))?;
    let remote_files = fetch_all_matching(remote, &patterns)?;
    log::debug!("{} remote files match", remote_files.len());

    Ok((lock, sync_root, remote_files))
}

/// Write one remote file locally; returns the conflict it raised, if any.
fn pull_file(
    ctx: &SyncContext,
    sync_root: &Path,
    path: &str,
    remote_content: &str,
) -> Result<Option<Conflict>> {
    let local_path = paths::to_local(path, sync_root);
    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut conflict = None;
    if local_path.exists() {
        let local_content = fs::read_to_string(&local_path)
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        if local_content == remote_content {
            log::debug!("{path} is up to date");
            return Ok(None);
        }

        let resolution = ctx
            .resolver
            .resolve(path, &local_content, remote_content, SyncDirection::Pull)?;
        log::info!("Conflict in {path} resolved as {}", resolution.as_str());

        let write = resolution == ConflictResolution::UseRemote;
        conflict = Some(Conflict {
            path: path.to_string(),
            local_content,
            remote_content: remote_content.to_string(),
            resolution,
        });
        if !write {
            return Ok(conflict);
        }
    }

    fs::write(&local_path, remote_content)
        .with_context(|| format!("Failed to write {}", local_path.display()))?;
    log::debug!("Wrote {}", local_path.display());

    Ok(conflict)
}
