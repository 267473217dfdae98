use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use url::Url;

use super::error::GitHubError;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One authenticated call to the GitHub REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub token: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Reason phrase of the status, e.g. "Not Found". Falls back to the numeric code.
    pub fn status_text(&self) -> String {
        self.status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| self.status.as_str().to_string())
    }
}

/// Boundary between [super::client::GitHubClient] and the network, so that the client can be
/// exercised without a real server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GitHubError>;
}

/// [HttpTransport] backed by a shared [reqwest::Client].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, GitHubError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GitHubError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .bearer_auth(&request.token)
            .header(header::ACCEPT, GITHUB_MEDIA_TYPE);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}
