use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use bytes::Bytes;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ContentRepository, PutFile, RepoFile};
use crate::error::RepoError;

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// API version pinned through the `X-GitHub-Api-Version` header.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub-backed implementation of [`ContentRepository`].
///
/// Files are read and written through the contents API; files too large for
/// the contents API (over 1MB) are fetched through the git blob API instead.
#[derive(Clone)]
pub struct GitHubRepository {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    token: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

impl GitHubRepository {
    /// Create a repository client for `owner/repo`.
    ///
    /// # Arguments
    /// * `api_url` - REST endpoint, [`DEFAULT_API_URL`] for github.com
    /// * `token` - Token with contents read/write permission
    /// * `branch` - Branch to commit to; `None` uses the default branch
    pub fn new(
        api_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: Option<String>,
        token: impl Into<String>,
    ) -> Result<Self, RepoError> {
        let client = Client::builder()
            .user_agent(concat!("repo-gallery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepoError::Connection(e.to_string()))?;

        let owner = owner.into();
        let repo = repo.into();
        let identifier = format!("github://{}/{}", owner, repo);

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            owner,
            repo,
            branch,
            token: token.into(),
            identifier,
        })
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Get the configured branch, if any.
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            self.owner,
            self.repo,
            encode_path(path)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<String, RepoError> {
        let response = request
            .send()
            .await
            .map_err(|e| RepoError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RepoError::Connection(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        debug!(status = status.as_u16(), path = path, "Repository API rejected request");
        Err(map_status(status, path, &body))
    }
}

#[async_trait]
impl ContentRepository for GitHubRepository {
    async fn get_file(&self, path: &str) -> Result<RepoFile, RepoError> {
        let url = self.contents_url(path);
        let mut request = self.request(Method::GET, &url);
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch)]);
        }

        let body = self.send(request, path).await?;

        // Directories come back as JSON arrays
        if body.trim_start().starts_with('[') {
            return Err(RepoError::NotFound(format!("{} (is a directory)", path)));
        }

        let parsed: ContentsResponse =
            serde_json::from_str(&body).map_err(|e| RepoError::Decode(e.to_string()))?;

        if parsed.kind != "file" {
            return Err(RepoError::NotFound(format!("{} (is a {})", path, parsed.kind)));
        }

        let content = match (parsed.encoding.as_deref(), parsed.content.as_deref()) {
            (Some("base64"), Some(encoded)) if !encoded.is_empty() => {
                Some(decode_base64_lines(encoded)?)
            }
            // empty files are still inline
            (Some("base64"), Some(_)) if parsed.size == 0 => Some(Bytes::new()),
            _ => None,
        };

        Ok(RepoFile {
            path: path.to_string(),
            sha: parsed.sha,
            size: parsed.size,
            content,
        })
    }

    async fn get_blob(&self, sha: &str) -> Result<Bytes, RepoError> {
        let url = format!(
            "{}/repos/{}/{}/git/blobs/{}",
            self.api_url, self.owner, self.repo, sha
        );
        let body = self.send(self.request(Method::GET, &url), sha).await?;

        let parsed: BlobResponse =
            serde_json::from_str(&body).map_err(|e| RepoError::Decode(e.to_string()))?;

        match parsed.encoding.as_str() {
            "base64" => decode_base64_lines(&parsed.content),
            "utf-8" => Ok(Bytes::from(parsed.content.into_bytes())),
            other => Err(RepoError::Decode(format!("unknown blob encoding: {}", other))),
        }
    }

    async fn put_file(&self, request: PutFile) -> Result<String, RepoError> {
        let url = self.contents_url(&request.path);
        let body = PutBody {
            message: &request.message,
            content: BASE64_STANDARD.encode(&request.content),
            sha: request.sha.as_deref(),
            branch: self.branch.as_deref(),
        };

        let response = self
            .send(self.request(Method::PUT, &url).json(&body), &request.path)
            .await?;

        let parsed: PutResponse =
            serde_json::from_str(&response).map_err(|e| RepoError::Decode(e.to_string()))?;

        debug!(path = %request.path, sha = %parsed.content.sha, "Committed file");
        Ok(parsed.content.sha)
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<(), RepoError> {
        let url = self.contents_url(path);
        let body = DeleteBody {
            message,
            sha,
            branch: self.branch.as_deref(),
        };

        self.send(self.request(Method::DELETE, &url).json(&body), path)
            .await?;

        debug!(path = path, "Deleted file");
        Ok(())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Percent-encode each segment of a repository path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The API wraps base64 content at 60 columns.
fn decode_base64_lines(encoded: &str) -> Result<Bytes, RepoError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(compact)
        .map(Bytes::from)
        .map_err(|e| RepoError::Decode(format!("invalid base64 content: {}", e)))
}

fn map_status(status: StatusCode, path: &str, body: &str) -> RepoError {
    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status {
        StatusCode::NOT_FOUND => RepoError::NotFound(path.to_string()),
        // 422 is returned when a file exists and no sha was supplied
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RepoError::Conflict(format!("{}: {}", path, message))
        }
        _ => RepoError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
