//! JSON wire messages of the provisioning API.
//!
//! REST bodies and the frames sent to the peer during a login handshake.
//! Field names are part of the public contract; do not rename them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errcode;

/// Body of a simple successful action: `{success:true, status}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: String,
}

impl StatusResponse {
    pub fn ok(status: impl Into<String>) -> Self {
        Self {
            success: true,
            status: status.into(),
        }
    }
}

/// Body of every failure: `{success:false, error, errcode}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub errcode: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, errcode: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errcode: errcode.into(),
        }
    }
}

/// A frame sent to the peer over the login WebSocket.
///
/// Zero or more `Code` frames are followed by exactly one terminal frame
/// (`Success` or `Failure`), unless the handshake is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoginMessage {
    /// A delivery code to display; supersedes any previous one.
    Code { code: String, timeout: u64 },
    /// The remote account was linked.
    Success { success: bool, id: String },
    /// The handshake failed.
    Failure(ErrorBody),
}

impl LoginMessage {
    pub fn code(code: impl Into<String>, timeout_secs: u64) -> Self {
        LoginMessage::Code {
            code: code.into(),
            timeout: timeout_secs,
        }
    }

    pub fn success(id: impl Into<String>) -> Self {
        LoginMessage::Success {
            success: true,
            id: id.into(),
        }
    }

    pub fn failure(error: impl Into<String>, errcode: impl Into<String>) -> Self {
        LoginMessage::Failure(ErrorBody::new(error, errcode))
    }

    /// Failure used for both a dial error and a result/login error.
    pub fn connection_error() -> Self {
        Self::failure("Failed to connect to Discord", errcode::CONNECTION_ERROR)
    }

    /// Whether this frame ends the handshake.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoginMessage::Code { .. })
    }
}

/// Heartbeat bookkeeping of the live remote connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub last_heartbeat_ack: Option<DateTime<Utc>>,
    pub last_heartbeat_sent: Option<DateTime<Utc>>,
}

/// Remote-service half of the ping response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub logged_in: bool,
    pub connected: bool,
    pub conn: Option<ConnectionStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// `GET /ping` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(rename = "discord")]
    pub remote: RemoteStatus,
    pub management_room: String,
    pub mxid: String,
}

/// One entry of `GET /guilds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildInfo {
    pub name: String,
    pub id: String,
    pub bridged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn code_frame_shape() {
        let v = serde_json::to_value(LoginMessage::code("XQR1", 120)).unwrap();
        assert_eq!(v, json!({"code": "XQR1", "timeout": 120}));
    }

    #[test]
    fn terminal_frame_shapes() {
        let ok = serde_json::to_value(LoginMessage::success("discorduser#1")).unwrap();
        assert_eq!(ok, json!({"success": true, "id": "discorduser#1"}));

        let fail = serde_json::to_value(LoginMessage::connection_error()).unwrap();
        assert_eq!(
            fail,
            json!({
                "success": false,
                "error": "Failed to connect to Discord",
                "errcode": "connection error"
            })
        );
    }

    #[test]
    fn decodes_each_variant() {
        let code: LoginMessage = serde_json::from_str(r#"{"code":"A","timeout":5}"#).unwrap();
        assert_eq!(code, LoginMessage::code("A", 5));
        assert!(!code.is_terminal());

        let ok: LoginMessage = serde_json::from_str(r#"{"success":true,"id":"x"}"#).unwrap();
        assert_eq!(ok, LoginMessage::success("x"));
        assert!(ok.is_terminal());

        let fail: LoginMessage =
            serde_json::from_str(r#"{"success":false,"error":"e","errcode":"c"}"#).unwrap();
        assert_eq!(fail, LoginMessage::failure("e", "c"));
    }

    #[test]
    fn ping_uses_discord_key_and_omits_missing_id() {
        let ping = PingResponse {
            remote: RemoteStatus {
                logged_in: false,
                connected: false,
                conn: None,
                id: None,
            },
            management_room: String::new(),
            mxid: "@u:server".into(),
        };
        let v = serde_json::to_value(&ping).unwrap();
        assert_eq!(
            v,
            json!({
                "discord": {"logged_in": false, "connected": false, "conn": null},
                "management_room": "",
                "mxid": "@u:server"
            })
        );
    }
}
