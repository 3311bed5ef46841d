//! Session commands: ping, disconnect, reconnect, logout.

use crate::error::ApiError;
use crate::user::BridgeUser;
use provisioning_core::{errcode, PingResponse, RemoteStatus, StatusResponse};
use tracing::{error, warn};

pub async fn ping(user: &dyn BridgeUser) -> PingResponse {
    let snapshot = user.snapshot().await;
    PingResponse {
        remote: RemoteStatus {
            logged_in: snapshot.logged_in,
            connected: snapshot.connected,
            conn: snapshot.conn,
            id: snapshot.remote_id.filter(|id| !id.is_empty()),
        },
        management_room: snapshot.management_room,
        mxid: snapshot.mxid,
    }
}

pub async fn disconnect(user: &dyn BridgeUser) -> Result<StatusResponse, ApiError> {
    if !user.connected().await {
        return Err(ApiError::conflict(
            "You're not connected to Discord",
            errcode::NOT_CONNECTED,
        ));
    }
    user.disconnect().await.map_err(|e| {
        error!(mxid = user.mxid(), error = %e, "failed to disconnect");
        ApiError::upstream("Failed to disconnect from Discord", errcode::FAILED_TO_DISCONNECT)
    })?;
    Ok(StatusResponse::ok("Disconnected from Discord"))
}

pub async fn reconnect(user: &dyn BridgeUser) -> Result<StatusResponse, ApiError> {
    if user.connected().await {
        return Err(ApiError::conflict(
            "You're already connected to Discord",
            errcode::ALREADY_CONNECTED,
        ));
    }
    user.connect().await.map_err(|e| {
        error!(mxid = user.mxid(), error = %e, "failed to connect");
        ApiError::upstream("Failed to connect to Discord", errcode::FAILED_TO_CONNECT)
    })?;
    Ok(StatusResponse::ok("Connected to Discord"))
}

/// Log out of the remote service.
///
/// With `force`, a missing live session or a failing logout still reports
/// success.
pub async fn logout(user: &dyn BridgeUser, force: bool) -> Result<StatusResponse, ApiError> {
    let snapshot = user.snapshot().await;
    if !snapshot.logged_in {
        return Err(not_logged_in());
    }

    if snapshot.conn.is_none() {
        return if force {
            Ok(logged_out())
        } else {
            Err(not_logged_in())
        };
    }

    if let Err(e) = user.logout().await {
        warn!(mxid = user.mxid(), error = %e, force, "error while logging out");
        if !force {
            return Err(ApiError::upstream(
                format!("Unknown error while logging out: {e}"),
                errcode::UNKNOWN,
            ));
        }
    }
    Ok(logged_out())
}

/// `force` is on unless the query says `false` in any case.
pub fn parse_force(value: Option<&str>) -> bool {
    !value.is_some_and(|v| v.eq_ignore_ascii_case("false"))
}

fn not_logged_in() -> ApiError {
    ApiError::not_found("You're not logged in", errcode::NOT_LOGGED_IN)
}

fn logged_out() -> StatusResponse {
    StatusResponse::ok("Logged out successfully.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{MemoryUser, Operation};
    use axum::http::StatusCode;

    async fn logged_in_user() -> MemoryUser {
        let user = MemoryUser::new("@u:server");
        user.commit_remote_id("remote#1").await.unwrap();
        user.login("tok").await.unwrap();
        user
    }

    #[test]
    fn force_parsing() {
        assert!(parse_force(None));
        assert!(parse_force(Some("")));
        assert!(parse_force(Some("true")));
        assert!(parse_force(Some("0")));
        assert!(!parse_force(Some("false")));
        assert!(!parse_force(Some("FaLsE")));
    }

    #[tokio::test]
    async fn ping_reports_identity() {
        let user = logged_in_user().await;
        let resp = ping(&user).await;
        assert!(resp.remote.logged_in && resp.remote.connected);
        assert_eq!(resp.remote.id.as_deref(), Some("remote#1"));
        assert!(resp.remote.conn.is_some());
        assert_eq!(resp.mxid, "@u:server");
    }

    #[tokio::test]
    async fn disconnect_twice() {
        let user = logged_in_user().await;
        assert_eq!(
            disconnect(&user).await.unwrap(),
            StatusResponse::ok("Disconnected from Discord")
        );
        let err = disconnect(&user).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.body().errcode, errcode::NOT_CONNECTED);
    }

    #[tokio::test]
    async fn reconnect_when_connected_conflicts() {
        let user = logged_in_user().await;
        let err = reconnect(&user).await.unwrap_err();
        assert_eq!(err.body().errcode, errcode::ALREADY_CONNECTED);

        user.disconnect().await.unwrap();
        assert!(reconnect(&user).await.is_ok());
    }

    #[tokio::test]
    async fn reconnect_failure_is_upstream() {
        let user = logged_in_user().await;
        user.disconnect().await.unwrap();
        user.inject_failure(Operation::Connect).await;
        let err = reconnect(&user).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().errcode, errcode::FAILED_TO_CONNECT);
    }

    #[tokio::test]
    async fn logout_not_logged_in() {
        let user = MemoryUser::new("@u:server");
        let err = logout(&user, true).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body().errcode, errcode::NOT_LOGGED_IN);
    }

    #[tokio::test]
    async fn logout_without_live_session() {
        let user = logged_in_user().await;
        user.disconnect().await.unwrap();

        assert!(logout(&user, true).await.is_ok());
        // Forced without a session: nothing was actually logged out.
        assert!(user.logged_in().await);

        let err = logout(&user, false).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_error_depends_on_force() {
        let user = logged_in_user().await;
        user.inject_failure(Operation::Logout).await;

        let err = logout(&user, false).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().errcode, errcode::UNKNOWN);

        assert_eq!(
            logout(&user, true).await.unwrap(),
            StatusResponse::ok("Logged out successfully.")
        );
    }

    #[tokio::test]
    async fn logout_clears_login() {
        let user = logged_in_user().await;
        logout(&user, false).await.unwrap();
        assert!(!user.logged_in().await);
        assert!(ping(&user).await.remote.id.is_none());
    }
}
