use provisioning_core::ErrorBody;
use thiserror::Error;

/// Errors returned by [`crate::ProvisioningClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a structured error body.
    #[error("provisioning API returned {status}: {} ({})", .body.error, .body.errcode)]
    Api { status: u16, body: ErrorBody },

    /// Non-success status without a parseable error body.
    #[error("provisioning API returned {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(String),
}

impl ClientError {
    /// HTTP status, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } | ClientError::Status(status) => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The `errcode` of a structured error.
    pub fn errcode(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } => Some(&body.errcode),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
