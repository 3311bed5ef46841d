//! provisioning-server: the bridge's provisioning API.
//!
//! Authenticates callers against a shared secret, runs the remote-auth login
//! handshake over a WebSocket, and exposes session and guild commands.

pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod login;
pub mod remote_auth;
pub mod server;
pub mod transport;
pub mod user;

pub use config::{ConfigOverrides, ServerConfig};
pub use error::ApiError;
pub use server::{AppState, ProvisioningServer};
