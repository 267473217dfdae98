use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use url::Url;

use super::{
    error::GitHubError,
    transport::{ApiRequest, ApiResponse, HttpTransport},
};

pub const DEFAULT_API_HOST: &str = "https://api.github.com";

/// Repository coordinates and credentials a [GitHubClient] is bound to.
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub branch: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("host", &self.host)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("branch", &self.branch)
            .finish()
    }
}

/// A file in the repository. `sha` is the blob revision GitHub requires to update or delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: String,
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks and submodules.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
    sha: Option<String>,
}

#[derive(Deserialize)]
struct CommitResponse {
    commit: CommitRef,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Serialize)]
struct SaveBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

/// Client of the GitHub Contents API for a single repository and branch.
///
/// Every failure is logged here and then returned; nothing is retried.
pub struct GitHubClient {
    config: GitHubConfig,
    transport: Arc<dyn HttpTransport>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Fetches a file. A missing file is `Ok(None)`, not an error.
    #[instrument(skip(self))]
    pub async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, GitHubError> {
        self.get_file_inner(path)
            .await
            .inspect_err(|e| error!("Failed to fetch file {path}: {e}"))
    }

    /// Creates or updates a file and returns the sha of the resulting commit. When `file.sha` is
    /// absent the current revision is looked up first, since GitHub refuses to overwrite without it.
    #[instrument(skip(self, file), fields(path = %file.path))]
    pub async fn save_file(&self, file: RemoteFile, message: &str) -> Result<String, GitHubError> {
        self.save_file_inner(file, message)
            .await
            .inspect_err(|e| error!("Failed to save file: {e}"))
    }

    /// Deletes an existing file and returns the sha of the resulting commit.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, path: &str, message: &str) -> Result<String, GitHubError> {
        self.delete_file_inner(path, message)
            .await
            .inspect_err(|e| error!("Failed to delete file {path}: {e}"))
    }

    /// Lists a directory. An empty `path` lists the repository root.
    #[instrument(skip(self))]
    pub async fn list_files(&self, path: &str) -> Result<Vec<RemoteEntry>, GitHubError> {
        self.list_files_inner(path)
            .await
            .inspect_err(|e| error!("Failed to list files in {path:?}: {e}"))
    }

    async fn get_file_inner(&self, path: &str) -> Result<Option<RemoteFile>, GitHubError> {
        let response = self
            .send(Method::GET, self.contents_url(path, true)?, None)
            .await?;
        if response.status == StatusCode::NOT_FOUND {
            debug!("File {path} doesn't exist");
            return Ok(None);
        }
        ensure_success(&response, "Failed to fetch file")?;

        let data: ContentResponse = serde_json::from_str(&response.body)?;
        Ok(Some(RemoteFile {
            path: path.to_string(),
            content: decode_content(&data.content)?,
            sha: data.sha,
        }))
    }

    async fn save_file_inner(&self, file: RemoteFile, message: &str) -> Result<String, GitHubError> {
        let sha = match file.sha {
            Some(sha) => Some(sha),
            None => self.get_file_inner(&file.path).await?.and_then(|v| v.sha),
        };

        let body = SaveBody {
            message,
            content: STANDARD.encode(file.content.as_bytes()),
            branch: &self.config.branch,
            sha: sha.as_deref(),
        };
        let response = self
            .send(
                Method::PUT,
                self.contents_url(&file.path, false)?,
                Some(serde_json::to_value(&body)?),
            )
            .await?;
        ensure_success(&response, "Failed to save file")?;

        let data: CommitResponse = serde_json::from_str(&response.body)?;
        Ok(data.commit.sha)
    }

    async fn delete_file_inner(&self, path: &str, message: &str) -> Result<String, GitHubError> {
        let Some(sha) = self.get_file_inner(path).await?.and_then(|v| v.sha) else {
            return Err(GitHubError::MissingRevision(path.to_string()));
        };

        let body = DeleteBody {
            message,
            sha: &sha,
            branch: &self.config.branch,
        };
        let response = self
            .send(
                Method::DELETE,
                self.contents_url(path, false)?,
                Some(serde_json::to_value(&body)?),
            )
            .await?;
        ensure_success(&response, "Failed to delete file")?;

        let data: CommitResponse = serde_json::from_str(&response.body)?;
        Ok(data.commit.sha)
    }

    async fn list_files_inner(&self, path: &str) -> Result<Vec<RemoteEntry>, GitHubError> {
        let response = self
            .send(Method::GET, self.contents_url(path, true)?, None)
            .await?;
        ensure_success(&response, "Failed to list files")?;
        Ok(serde_json::from_str(&response.body)?)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, GitHubError> {
        debug!("{method} {url}");
        self.transport
            .send(ApiRequest {
                method,
                url,
                token: self.config.token.clone(),
                body,
            })
            .await
    }

    /// `{host}/repos/{owner}/{repo}/contents/{path}`, with `?ref={branch}` for reads. Writes carry
    /// the branch in their body instead.
    fn contents_url(&self, path: &str, with_ref: bool) -> Result<Url, GitHubError> {
        let mut url = Url::parse(&self.config.host)?;
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidHost(self.config.host.clone()))?
            .pop_if_empty()
            .extend([
                "repos",
                self.config.owner.as_str(),
                self.config.repo.as_str(),
                "contents",
            ])
            .extend(path.split('/').filter(|v| !v.is_empty()));
        if with_ref {
            url.query_pairs_mut().append_pair("ref", &self.config.branch);
        }
        Ok(url)
    }
}

fn ensure_success(response: &ApiResponse, action: &'static str) -> Result<(), GitHubError> {
    if response.status.is_success() {
        return Ok(());
    }
    Err(GitHubError::Status {
        action,
        status: response.status,
        status_text: response.status_text(),
    })
}

/// GitHub wraps base64 content at 60 columns.
fn decode_content(content: &str) -> Result<String, GitHubError> {
    let cleaned = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    Ok(String::from_utf8(STANDARD.decode(cleaned)?)?)
}
