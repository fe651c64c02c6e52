//! Repository identity parsing.
//!
//! Accepts the shapes users actually paste into the settings file:
//!
//! - `owner/repo` shorthand
//! - web URLs such as `https://github.com/owner/repo` (scheme and `.git` optional)
//! - SSH remotes such as `git@github.com:owner/repo.git`
//!
//! Anything else yields `None`, which callers treat as "not configured".

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub repository_name: String,
}

fn shapes() -> &'static [Regex; 3] {
    static SHAPES: OnceLock<[Regex; 3]> = OnceLock::new();
    SHAPES.get_or_init(|| {
        [
            // owner/repo
            Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)$"),
            // [scheme://]host/owner/repo[/]
            Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.-]*://)?[^/:\s]+(?::\d+)?/([^/\s]+)/([^/\s]+?)/?$"),
            // [user@]host:owner/repo
            Regex::new(r"^(?:[^@/\s]+@)?[^:/\s]+:([^/\s]+)/([^/\s]+?)/?$"),
        ]
        .map(|re| re.unwrap_or_else(|e| unreachable!("static repository regex: {e}")))
    })
}

impl RepositoryIdentity {
    /// Parse a user-supplied repository reference; first matching shape wins.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        shapes().iter().find_map(|re| {
            let caps = re.captures(input)?;
            let owner = caps.get(1)?.as_str();
            let name = caps.get(2)?.as_str();
            let name = name.strip_suffix(".git").unwrap_or(name);
            if owner.is_empty() || name.is_empty() {
                return None;
            }
            Some(RepositoryIdentity {
                owner: owner.to_string(),
                repository_name: name.to_string(),
            })
        })
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repository_name)
    }
}
