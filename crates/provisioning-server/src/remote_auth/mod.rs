//! Client side of the remote service's QR/code login ceremony.
//!
//! A [`RemoteAuthProvider`] creates one [`RemoteAuthClient`] per handshake.
//! The client streams delivery codes, signals completion, and then yields
//! the linked identity.

pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub use scripted::{Outcome, Script, ScriptedProvider};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteAuthError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("cancelled")]
    Cancelled,

    /// Asked for a result before the ceremony completed.
    #[error("no result available")]
    NoResult,
}

/// Identity linked by a completed ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
pub trait RemoteAuthClient: Send {
    /// Start the ceremony.
    ///
    /// Returns once the remote side has accepted the connection. Codes are
    /// then pushed on `codes` and `done` fires (or is dropped) on completion.
    /// Both senders are dropped if this returns an error. The client stops
    /// when `cancel` fires.
    async fn dial(
        &mut self,
        cancel: CancellationToken,
        codes: mpsc::Sender<String>,
        done: oneshot::Sender<()>,
    ) -> Result<(), RemoteAuthError>;

    /// Final outcome; valid once `done` has fired.
    async fn result(&mut self) -> Result<RemoteIdentity, RemoteAuthError>;
}

pub trait RemoteAuthProvider: Send + Sync {
    fn new_client(&self) -> Result<Box<dyn RemoteAuthClient>, RemoteAuthError>;
}
