//! provisioning-client: Rust client for the bridge provisioning API.
//!
//! [`ProvisioningClient`] wraps the REST commands; [`ProvisioningClient::login`]
//! opens the login WebSocket and yields [`LoginMessage`] updates through a
//! [`LoginSession`].

pub mod client;
pub mod error;
pub mod login;

pub use client::ProvisioningClient;
pub use error::{ClientError, ClientResult};
pub use login::LoginSession;
pub use provisioning_core::{GuildInfo, LoginMessage, PingResponse, StatusResponse};
