//! Credential gate: shared-secret check and caller resolution.

use super::Caller;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::{Query, Request, State};
use axum::http::header::{AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use provisioning_core::{bearer_token, errcode, subprotocol_secret};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
struct UserQuery {
    user_id: Option<String>,
}

/// What a request presented, copied out so no borrow of it is held across
/// the directory lookup.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl Credentials {
    pub(crate) fn from_request(req: &Request, protocol: &str) -> Self {
        let headers = req.headers();
        // An empty or non-UTF-8 header counts as absent.
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());
        let token = match authorization {
            Some(value) => Some(bearer_token(value).to_string()),
            None if req.uri().path().ends_with("/login") => headers
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|v| v.to_str().ok())
                .and_then(|offer| subprotocol_secret(offer, protocol))
                .map(str::to_string),
            None => None,
        };
        let user_id = Query::<UserQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(q)| q.user_id)
            .filter(|id| !id.is_empty());
        Self { token, user_id }
    }
}

async fn authorize(state: &AppState, credentials: Credentials) -> Result<Caller, ApiError> {
    let token = credentials.token.unwrap_or_default();
    if !state.secret.matches(&token) {
        return Err(ApiError::Authorization);
    }
    let user_id = credentials
        .user_id
        .ok_or(ApiError::MissingParam("user_id"))?;
    let user = state
        .directory
        .user_by_mxid(&user_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("User {user_id} not found"), errcode::NOT_FOUND))?;
    Ok(Caller(user))
}

/// Middleware in front of every provisioning route.
///
/// Rejected requests never reach the handler. Every request is logged once
/// its response is known.
pub async fn credential_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let credentials = Credentials::from_request(&req, &state.protocol);
    let requested = credentials.user_id.clone().unwrap_or_default();

    let (mxid, response) = match authorize(&state, credentials).await {
        Ok(caller) => {
            let mxid = caller.user().mxid().to_string();
            req.extensions_mut().insert(caller);
            (mxid, next.run(req).await)
        }
        Err(e) => (requested, e.into_response()),
    };

    info!(
        method = %method,
        path = %path,
        mxid = %mxid,
        elapsed_secs = start.elapsed().as_secs_f64(),
        status = response.status().as_u16(),
        "provisioning request"
    );
    response
}
