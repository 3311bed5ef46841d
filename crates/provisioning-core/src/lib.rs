//! provisioning-core: Shared protocol library for the bridge provisioning API.
//!
//! Provides the JSON wire messages exchanged over REST and the login
//! WebSocket, the errcode vocabulary, shared-secret handling, and the
//! subprotocol token helpers used by both server and client.

pub mod errcode;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod secret;

// Re-export commonly used items at crate root.
pub use error::{ProvResult, ProvisioningError};
pub use messages::{
    ConnectionStats, ErrorBody, GuildInfo, LoginMessage, PingResponse, RemoteStatus,
    StatusResponse,
};
pub use protocol::{
    bearer_token, subprotocol_offer, subprotocol_secret, DEFAULT_CODE_TIMEOUT_SECS,
    DEFAULT_PREFIX, DEFAULT_SUBPROTOCOL,
};
pub use secret::SharedSecret;
