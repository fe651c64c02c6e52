//! # cursor-sync
//!
//! A command-line tool for keeping Cursor rules, prompts and MCP server
//! configuration in sync with a directory of a GitHub repository.
//!
//! ## Overview
//!
//! `cursor-sync` mirrors a small set of files between a local `.cursor`
//! directory (either `~/.cursor` or `<workspace>/.cursor`) and one branch of a
//! GitHub repository, read and written through the REST contents API. The
//! `.cursorrules` file that sits next to the `.cursor` directory travels along.
//!
//! ## Key Features
//!
//! - **Pull and push**: Copy selected files in either direction, one file per request
//! - **Glob selection**: Pick files with `*`, `**` and `?` patterns
//! - **Conflict handling**: Keep local, use remote, or ask with a side-by-side diff
//! - **Auto sync**: Pull on an interval, on startup, or into new workspaces
//! - **Cross-platform**: Supports Linux, macOS, and Windows with platform-specific config directories
//!
//! ## Architecture
//!
//! - Selection and path handling ([`pattern`], [`paths`], [`scanner`])
//! - GitHub access ([`repo_url`], [`remote`])
//! - Conflict resolution ([`conflict`], [`interactive_conflict`])
//! - Core synchronization logic ([`sync`], [`scheduler`])
//! - Configuration, logging and errors ([`config`], [`settings`], [`logger`], [`error`])
//! - Command handlers used by the binary ([`handlers`])

/// Platform-agnostic configuration directory management for cursor-sync.
///
/// Provides utilities for locating the configuration, state, lock and log
/// files following platform conventions (XDG on Linux, Application Support on
/// macOS, AppData on Windows).
pub mod config;

/// Conflict resolution between differing local and remote files.
///
/// Applies the configured policy, and for `ask` drives a two-step choice
/// through the [`conflict::UserChoicePrompt`] and [`conflict::DocumentViewer`]
/// capabilities.
pub mod conflict;

pub mod error;

/// Command handler functions called from the binary.
pub mod handlers;

/// Terminal implementations of the conflict prompts.
pub mod interactive_conflict;

/// Logging configuration and utilities.
///
/// Sets up dual logging to both console (configurable via `RUST_LOG` environment
/// variable) and a persistent log file in the config directory. Includes automatic
/// log rotation when files exceed size limits.
pub mod logger;

/// Mapping between remote paths and local files.
pub mod paths;

/// Glob dialect used by `files_to_sync`.
pub mod pattern;

pub mod remote;

/// Parsing of user-supplied repository references.
pub mod repo_url;

/// Owned periodic task used for auto sync.
pub mod scheduler;

/// Local file collection for push.
pub mod scanner;

/// User settings (`config.toml`) and the resolved per-run configuration.
pub mod settings;

/// Core synchronization logic.
///
/// Implements the two operations:
/// - **Pull**: Writes remote files into the local sync root, resolving conflicts
/// - **Push**: Creates or updates remote files from the local sync root
///
/// Includes the persisted sync state, the per-target lock and the status view.
pub mod sync;
