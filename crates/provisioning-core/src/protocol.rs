//! Protocol constants and token-location helpers.
//!
//! Browsers cannot set an `Authorization` header on a WebSocket upgrade, so
//! the login route also accepts the secret as a subprotocol offer entry:
//!
//! ```text
//! Sec-WebSocket-Protocol: com.gitlab.beeper.discord, com.gitlab.beeper.discord-<secret>
//! ```
//!
//! The bare identifier is what the server selects; the suffixed entry only
//! carries the secret.

/// Subprotocol identifier negotiated on the login WebSocket.
pub const DEFAULT_SUBPROTOCOL: &str = "com.gitlab.beeper.discord";

/// Route prefix the provisioning API is mounted under.
pub const DEFAULT_PREFIX: &str = "/_matrix/provision/v1";

/// Advisory display lifetime of a delivery code, in seconds.
pub const DEFAULT_CODE_TIMEOUT_SECS: u64 = 120;

/// Strip an optional `Bearer ` prefix from an `Authorization` header value.
pub fn bearer_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header)
}

/// Find the secret embedded in a `Sec-WebSocket-Protocol` offer list.
///
/// Returns the suffix of the first entry shaped `<protocol>-<secret>`.
pub fn subprotocol_secret<'a>(offer: &'a str, protocol: &str) -> Option<&'a str> {
    offer.split(',').map(str::trim).find_map(|part| {
        part.strip_prefix(protocol)
            .and_then(|rest| rest.strip_prefix('-'))
    })
}

/// Build the subprotocol offer a client sends on the login upgrade.
pub fn subprotocol_offer(protocol: &str, secret: &str) -> String {
    format!("{protocol}, {protocol}-{secret}")
}
