//! REST command handlers.
//!
//! Each handler takes the gate-resolved [`Caller`] and delegates to a command
//! function over `&dyn BridgeUser`.

pub mod guilds;
pub mod session;

use crate::auth::Caller;
use crate::error::ApiError;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::Json;
use provisioning_core::{GuildInfo, PingResponse, StatusResponse};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct LogoutQuery {
    pub force: Option<String>,
}

pub async fn ping(caller: Caller) -> Json<PingResponse> {
    Json(session::ping(caller.user()).await)
}

pub async fn disconnect(caller: Caller) -> Result<Json<StatusResponse>, ApiError> {
    session::disconnect(caller.user()).await.map(Json)
}

pub async fn reconnect(caller: Caller) -> Result<Json<StatusResponse>, ApiError> {
    session::reconnect(caller.user()).await.map(Json)
}

pub async fn logout(
    caller: Caller,
    Query(query): Query<LogoutQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let force = session::parse_force(query.force.as_deref());
    session::logout(caller.user(), force).await.map(Json)
}

pub async fn list_guilds(caller: Caller) -> Json<Vec<GuildInfo>> {
    Json(guilds::list(caller.user()).await)
}

pub async fn bridge_guild(
    caller: Caller,
    Path(guild_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    guilds::bridge(caller.user(), &guild_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn join_entire_guild(
    caller: Caller,
    Path(guild_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    guilds::join_entire(caller.user(), &guild_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn unbridge_guild(
    caller: Caller,
    Path(guild_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    guilds::unbridge(caller.user(), &guild_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
