use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use similar::{ChangeTag, TextDiff};

use crate::error::SyncError;

/// Configured strategy for files that differ on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictPolicy {
    Ask,
    KeepLocal,
    UseRemote,
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ask" => Ok(ConflictPolicy::Ask),
            "keepLocal" | "keep-local" | "keep_local" => Ok(ConflictPolicy::KeepLocal),
            "useRemote" | "use-remote" | "use_remote" => Ok(ConflictPolicy::UseRemote),
            other => Err(SyncError::InvalidSetting {
                field: "conflict_resolution".into(),
                detail: format!("'{other}' is not one of ask, keepLocal, useRemote"),
            }
            .into()),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictPolicy::Ask => "ask",
            ConflictPolicy::KeepLocal => "keepLocal",
            ConflictPolicy::UseRemote => "useRemote",
        })
    }
}

/// Which side a sync run copies toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Pull,
    Push,
}

impl SyncDirection {
    pub fn as_str(&self) -> &str {
        match self {
            SyncDirection::Pull => "pull",
            SyncDirection::Push => "push",
        }
    }
}

/// Outcome recorded for one conflicting file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictResolution {
    KeepLocal,
    UseRemote,
    Skip,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &str {
        match self {
            ConflictResolution::KeepLocal => "keepLocal",
            ConflictResolution::UseRemote => "useRemote",
            ConflictResolution::Skip => "skip",
        }
    }
}

/// A file that exists on both sides with different content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub path: String,
    pub local_content: String,
    pub remote_content: String,
    pub resolution: ConflictResolution,
}

impl Conflict {
    /// Short human-readable description
    pub fn description(&self) -> String {
        format!(
            "{}: local {} bytes, remote {} bytes -> {}",
            self.path,
            self.local_content.len(),
            self.remote_content.len(),
            self.resolution.as_str()
        )
    }
}

/// Ask the user to pick one of several labeled options.
///
/// Returns `None` when the prompt is dismissed.
pub trait UserChoicePrompt {
    fn ask(&self, title: &str, options: &[&str]) -> Result<Option<String>>;
}

/// Show a read-only text document to the user.
pub trait DocumentViewer {
    fn show_document(&self, title: &str, document: &str) -> Result<()>;
}

pub const SHOW_DIFF: &str = "Show Diff";
pub const SKIP: &str = "Skip";

const MAX_COLUMN_WIDTH: usize = 60;

/// Option labels for the resolving choices, phrased for the direction.
///
/// Returns `(keep_local_label, use_remote_label)`.
pub fn option_labels(direction: SyncDirection) -> (&'static str, &'static str) {
    match direction {
        SyncDirection::Pull => ("Keep Local", "Use Remote"),
        SyncDirection::Push => ("Push Local", "Keep Remote"),
    }
}

/// Render both versions as a two-column, line-aligned document.
///
/// Rows start with `-` when a line exists only locally, `+` when only
/// remotely, and a space when both sides share it.
pub fn render_side_by_side(path: &str, local: &str, remote: &str) -> String {
    let left_header = format!("local: {path}");
    let width = local
        .lines()
        .map(|l| l.chars().count())
        .chain(std::iter::once(left_header.chars().count()))
        .max()
        .unwrap_or(0)
        .min(MAX_COLUMN_WIDTH);

    let mut doc = format!("  {left_header:<width$} |   remote: {path}\n");
    doc.push_str(&format!("  {} | {}\n", "-".repeat(width), "-".repeat(width)));

    let diff = TextDiff::from_lines(local, remote);
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches(['\r', '\n']);
        let row = match change.tag() {
            ChangeTag::Equal => format!("  {line:<width$} |   {line}"),
            ChangeTag::Delete => format!("- {line:<width$} |"),
            ChangeTag::Insert => format!("  {:<width$} | + {line}", ""),
        };
        doc.push_str(row.trim_end());
        doc.push('\n');
    }
    doc
}

/// Decides the fate of each conflicting file according to the policy
pub struct ConflictResolver<'a> {
    policy: ConflictPolicy,
    prompt: &'a dyn UserChoicePrompt,
    viewer: &'a dyn DocumentViewer,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(
        policy: ConflictPolicy,
        prompt: &'a dyn UserChoicePrompt,
        viewer: &'a dyn DocumentViewer,
    ) -> Self {
        ConflictResolver {
            policy,
            prompt,
            viewer,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Resolve one conflict; only `ConflictPolicy::Ask` involves the user.
    pub fn resolve(
        &self,
        path: &str,
        local: &str,
        remote: &str,
        direction: SyncDirection,
    ) -> Result<ConflictResolution> {
        match self.policy {
            ConflictPolicy::KeepLocal => Ok(ConflictResolution::KeepLocal),
            ConflictPolicy::UseRemote => Ok(ConflictResolution::UseRemote),
            ConflictPolicy::Ask => self.ask(path, local, remote, direction),
        }
    }

    fn ask(
        &self,
        path: &str,
        local: &str,
        remote: &str,
        direction: SyncDirection,
    ) -> Result<ConflictResolution> {
        let (keep_local, use_remote) = option_labels(direction);
        let title = format!("Conflict in {path}: local and remote versions differ");

        let choice = self
            .prompt
            .ask(&title, &[keep_local, use_remote, SHOW_DIFF, SKIP])?;

        let choice = if choice.as_deref() == Some(SHOW_DIFF) {
            self.viewer.show_document(
                &format!("{path} (local <-> remote)"),
                &render_side_by_side(path, local, remote),
            )?;
            self.prompt
                .ask(&format!("Resolve {path}"), &[keep_local, use_remote, SKIP])?
        } else {
            choice
        };

        Ok(match choice.as_deref() {
            Some(label) if label == keep_local => ConflictResolution::KeepLocal,
            Some(label) if label == use_remote => ConflictResolution::UseRemote,
            _ => ConflictResolution::Skip,
        })
    }
}

/// Prompt that never chooses anything; used where no user can answer.
pub struct NoPrompt;

impl UserChoicePrompt for NoPrompt {
    fn ask(&self, title: &str, _options: &[&str]) -> Result<Option<String>> {
        log::info!("Not interactive, skipping: {title}");
        Ok(None)
    }
}

impl DocumentViewer for NoPrompt {
    fn show_document(&self, _title: &str, _document: &str) -> Result<()> {
        Ok(())
    }
}
