use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{normalize_remote_path, AccessInfo, RemoteEntry, RemoteFileContent, RemoteStore};
use crate::error::SyncError;
use crate::repo_url::RepositoryIdentity;
use crate::settings::SyncConfig;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The contents endpoint answers with one object for a file path and an
/// array for a directory path.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Many(Vec<RemoteEntry>),
    One(RemoteEntry),
}

#[derive(Deserialize)]
struct FileMetadata {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutFile<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct RepositoryMetadata {
    #[serde(default)]
    permissions: Option<Permissions>,
}

#[derive(Deserialize)]
struct Permissions {
    #[serde(default)]
    push: bool,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// Blocking client for the GitHub REST contents API.
///
/// Bound to one repository, branch and sub-path for its whole lifetime; a
/// new client is built for every sync run. Requests are never retried.
pub struct GitHubClient {
    http: Client,
    api_url: String,
    raw_url: String,
    repository: RepositoryIdentity,
    branch: String,
    sub_path: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Build a client from resolved configuration.
    ///
    /// Fails with [`SyncError::NotConfigured`] when the repository reference
    /// cannot be parsed.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let repository = config.repository()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("cursor-sync/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build GitHub HTTP client")?;

        log::debug!(
            "GitHub client for {repository}@{} under '{}'",
            config.branch,
            config.repo_path
        );

        Ok(GitHubClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_url.trim_end_matches('/').to_string(),
            repository,
            branch: config.branch.clone(),
            sub_path: config.repo_path.clone(),
            token: config.token.clone(),
        })
    }

    pub fn repository(&self) -> &RepositoryIdentity {
        &self.repository
    }

    fn full_path(&self, relative_path: &str) -> String {
        normalize_remote_path(&self.sub_path, relative_path)
    }

    /// Append path segments to a base URL, percent-encoding each one.
    fn url_with_segments<'s>(
        base: &str,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url> {
        let mut url = Url::parse(base).with_context(|| format!("Invalid base URL: {base}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Base URL cannot carry a path: {base}"))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn contents_url(&self, relative_path: &str) -> Result<Url> {
        let full_path = self.full_path(relative_path);
        let mut url = Self::url_with_segments(
            &self.api_url,
            [
                "repos",
                self.repository.owner.as_str(),
                self.repository.repository_name.as_str(),
                "contents",
            ]
            .into_iter()
            .chain(full_path.split('/')),
        )?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    fn raw_content_url(&self, relative_path: &str) -> Result<Url> {
        let full_path = self.full_path(relative_path);
        Self::url_with_segments(
            &self.raw_url,
            [
                self.repository.owner.as_str(),
                self.repository.repository_name.as_str(),
                self.branch.as_str(),
            ]
            .into_iter()
            .chain(full_path.split('/')),
        )
    }

    fn repository_url(&self) -> Result<Url> {
        Self::url_with_segments(
            &self.api_url,
            [
                "repos",
                self.repository.owner.as_str(),
                self.repository.repository_name.as_str(),
            ],
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a non-success response into [`SyncError::Api`], preferring the
    /// server's own message over the status line.
    fn api_error(response: Response) -> anyhow::Error {
        let status = response.status();
        let message = response
            .json::<ApiMessage>()
            .map(|m| m.message)
            .unwrap_or_else(|_| status.to_string());
        SyncError::Api {
            status: status.as_u16(),
            message,
        }
        .into()
    }
}

impl RemoteStore for GitHubClient {
    fn list_directory(&self, relative_path: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.contents_url(relative_path)?;
        let response = self
            .authorized(self.http.get(url))
            .send()
            .with_context(|| format!("Failed to list remote directory '{relative_path}'"))?;

        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("Remote directory '{relative_path}' does not exist");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response));
        }

        let listing: Listing = response
            .json()
            .context("Failed to decode directory listing")?;
        let entries = match listing {
            Listing::Many(entries) => entries,
            Listing::One(entry) => vec![entry],
        };

        let dir = relative_path.trim_matches('/');
        Ok(entries
            .into_iter()
            .map(|mut entry| {
                entry.path = normalize_remote_path(dir, &entry.name);
                entry
            })
            .collect())
    }

    fn fetch_raw(&self, relative_path: &str) -> Result<String> {
        let url = self.raw_content_url(relative_path)?;
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch '{relative_path}'"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::FetchFailed {
                path: relative_path.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        response
            .text()
            .with_context(|| format!("Failed to read body of '{relative_path}'"))
    }

    fn fetch_with_revision(&self, relative_path: &str) -> Result<RemoteFileContent> {
        let url = self.contents_url(relative_path)?;
        let response = self
            .authorized(self.http.get(url))
            .send()
            .with_context(|| format!("Failed to fetch metadata for '{relative_path}'"))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response));
        }

        let metadata: FileMetadata = response
            .json()
            .with_context(|| format!("Failed to decode metadata for '{relative_path}'"))?;

        let raw = metadata.content.unwrap_or_default();
        let content = match metadata.encoding.as_deref() {
            Some("base64") => {
                // the API wraps base64 payloads at 60 columns
                let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = BASE64
                    .decode(compact)
                    .with_context(|| format!("Invalid base64 content for '{relative_path}'"))?;
                String::from_utf8(bytes)
                    .with_context(|| format!("'{relative_path}' is not UTF-8 text"))?
            }
            // files over 1MB come back without inline content
            Some("none") => self.fetch_raw(relative_path)?,
            _ => raw,
        };

        Ok(RemoteFileContent {
            path: relative_path.to_string(),
            content,
            revision_id: Some(metadata.sha),
        })
    }

    fn push(&self, relative_path: &str, content: &str, commit_message: &str) -> Result<()> {
        if self.token.is_none() {
            return Err(SyncError::MissingToken.into());
        }

        let existing = match self.fetch_with_revision(relative_path) {
            Ok(file) => file.revision_id,
            Err(e) if super::is_not_found(&e) => None,
            Err(e) => return Err(e),
        };

        let body = PutFile {
            message: commit_message,
            content: BASE64.encode(content.as_bytes()),
            branch: &self.branch,
            sha: existing.as_deref(),
        };

        let url = self.contents_url(relative_path)?;
        let response = self
            .authorized(self.http.put(url))
            .json(&body)
            .send()
            .with_context(|| format!("Failed to push '{relative_path}'"))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response));
        }

        log::debug!(
            "{} {relative_path}",
            if existing.is_some() { "Updated" } else { "Created" }
        );
        Ok(())
    }

    fn check_access(&self) -> AccessInfo {
        let result = self.repository_url().and_then(|url| {
            let response = self.authorized(self.http.get(url)).send()?;
            if !response.status().is_success() {
                return Err(Self::api_error(response));
            }
            Ok(response.json::<RepositoryMetadata>()?)
        });

        match result {
            Ok(metadata) => AccessInfo {
                can_read: true,
                can_write: self.token.is_some()
                    && metadata.permissions.is_some_and(|p| p.push),
            },
            Err(e) => {
                log::warn!("Access check for {} failed: {e:#}", self.repository);
                AccessInfo::default()
            }
        }
    }

    fn has_token(&self) -> bool {
        self.token.is_some()
    }
}
