use anyhow::Result;

use crate::conflict::{Conflict, ConflictResolution, SyncDirection};
use crate::error::SyncError;
use crate::remote::{is_not_found, GitHubClient, RemoteStore};
use crate::scanner::{self, LocalFiles};

use super::{SyncContext, SyncResult, SyncTarget, TargetLock};

/// Push the configured local files of a target to GitHub.
pub fn push(ctx: &SyncContext, target: SyncTarget) -> SyncResult {
    match GitHubClient::new(ctx.config) {
        Ok(client) => push_with_remote(ctx, &client, target),
        Err(e) => ctx.abort(SyncDirection::Push, e),
    }
}

/// Push through any [`RemoteStore`].
///
/// Needs a token and an existing sync root; without either nothing is read
/// or sent. Files missing remotely are created. A remote file that differs
/// is a conflict and is overwritten only when resolved to `keepLocal`.
pub fn push_with_remote<R: RemoteStore + ?Sized>(
    ctx: &SyncContext,
    remote: &R,
    target: SyncTarget,
) -> SyncResult {
    log::info!("Pushing {target} sync root");

    let (_lock, local) = match prepare(ctx, remote, target) {
        Ok(prepared) => prepared,
        Err(e) => return ctx.abort(SyncDirection::Push, e),
    };

    let mut result = SyncResult::default();
    for (path, e) in &local.unreadable {
        result.record_file_error(path, e);
    }
    for (path, content) in &local.files {
        match push_file(ctx, remote, path, content) {
            Ok(conflict) => {
                result.files_processed += 1;
                result.conflicts.extend(conflict);
            }
            Err(e) => result.record_file_error(path, &e),
        }
    }

    let considered = local.paths();
    ctx.record(target, SyncDirection::Push, considered, result)
}

fn prepare<R: RemoteStore + ?Sized>(
    ctx: &SyncContext,
    remote: &R,
    target: SyncTarget,
) -> Result<(Option<TargetLock>, LocalFiles)> {
    ctx.config.repository()?;
    if !remote.has_token() {
        return Err(SyncError::MissingToken.into());
    }

    let sync_root = ctx.roots.root_for(target)?;
    if !sync_root.is_dir() {
        return Err(SyncError::MissingTargetDirectory(sync_root.to_path_buf()).into());
    }
    let lock = ctx.lock(target)?;

    let local = scanner::collect(sync_root, &ctx.config.patterns)?;
    log::debug!("{} local files match", local.files.len() + local.unreadable.len());

    Ok((lock, local))
}

fn commit_message(path: &str) -> String {
    format!("Update {path} via cursor-sync")
}

/// Send one local file; returns the conflict it raised, if any.
fn push_file<R: RemoteStore + ?Sized>(
    ctx: &SyncContext,
    remote: &R,
    path: &str,
    local_content: &str,
) -> Result<Option<Conflict>> {
    let existing = match remote.fetch_with_revision(path) {
        Ok(file) => Some(file.content),
        Err(e) if is_not_found(&e) => None,
        Err(e) => return Err(e),
    };

    let mut conflict = None;
    if let Some(remote_content) = existing {
        if remote_content == local_content {
            log::debug!("{path} is up to date");
            return Ok(None);
        }

        let resolution = ctx
            .resolver
            .resolve(path, local_content, &remote_content, SyncDirection::Push)?;
        log::info!("Conflict in {path} resolved as {}", resolution.as_str());

        let send = resolution == ConflictResolution::KeepLocal;
        conflict = Some(Conflict {
            path: path.to_string(),
            local_content: local_content.to_string(),
            remote_content,
            resolution,
        });
        if !send {
            return Ok(conflict);
        }
    }

    remote.push(path, local_content, &commit_message(path))?;
    log::debug!("Pushed {path}");

    Ok(conflict)
}
