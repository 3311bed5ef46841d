use thiserror::Error;

/// Errors produced by the provisioning protocol layer.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote auth error: {0}")]
    RemoteAuth(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ProvisioningError {
    fn from(e: serde_json::Error) -> Self {
        ProvisioningError::Codec(e.to_string())
    }
}

pub type ProvResult<T> = Result<T, ProvisioningError>;
