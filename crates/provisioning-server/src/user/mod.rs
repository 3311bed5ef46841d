//! The bridge-side account a provisioning request acts on behalf of.
//!
//! [`BridgeUser`] is the seam to the bridge: the provisioning API only ever
//! reaches session state through it. Implementations own their locking; every
//! method holds the user's lock for its own duration only, never across a
//! caller's await.

pub mod memory;

use async_trait::async_trait;
use provisioning_core::{ConnectionStats, GuildInfo};
use std::sync::Arc;
use thiserror::Error;

pub use memory::{MemoryDirectory, MemoryUser, Operation};

/// Errors reported by a [`BridgeUser`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("not connected")]
    NotConnected,

    #[error("guild {0} not found")]
    GuildNotFound(String),

    #[error("{0}")]
    Upstream(String),
}

/// Consistent view of a user's state, taken under a single lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub mxid: String,
    pub remote_id: Option<String>,
    pub logged_in: bool,
    pub connected: bool,
    pub management_room: String,
    /// `None` when there is no live remote session object.
    pub conn: Option<ConnectionStats>,
}

/// A bridge account and its remote-service session.
#[async_trait]
pub trait BridgeUser: Send + Sync {
    /// Matrix user ID; immutable for the lifetime of the object.
    fn mxid(&self) -> &str;

    async fn logged_in(&self) -> bool;

    async fn connected(&self) -> bool;

    async fn snapshot(&self) -> UserSnapshot;

    async fn connect(&self) -> Result<(), UserError>;

    async fn disconnect(&self) -> Result<(), UserError>;

    /// Record the remote account ID and persist it.
    async fn commit_remote_id(&self, remote_id: &str) -> Result<(), UserError>;

    /// Finish login with the credential returned by remote auth.
    async fn login(&self, token: &str) -> Result<(), UserError>;

    async fn logout(&self) -> Result<(), UserError>;

    async fn guilds(&self) -> Vec<GuildInfo>;

    /// Bridge a guild; `everything` also joins every channel in it.
    async fn bridge_guild(&self, guild_id: &str, everything: bool) -> Result<(), UserError>;

    async fn unbridge_guild(&self, guild_id: &str) -> Result<(), UserError>;
}

/// Resolves caller identities. Looks users up; never creates them.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_by_mxid(&self, mxid: &str) -> Option<Arc<dyn BridgeUser>>;
}
