use reqwest::StatusCode;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum GitHubError {
    /// The API answered with a non-success status other than a tolerated 404.
    #[error("{action}: {status_text}")]
    Status {
        action: &'static str,
        status: StatusCode,
        status_text: String,
    },

    #[error("File not found or missing sha: {0}")]
    MissingRevision(String),

    #[error("Invalid API host: {0}")]
    InvalidHost(String),

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("File content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl GitHubError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GitHubError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
