//! Guild listing and bridging.

use crate::error::ApiError;
use crate::user::BridgeUser;
use provisioning_core::{errcode, GuildInfo};

pub async fn list(user: &dyn BridgeUser) -> Vec<GuildInfo> {
    user.guilds().await
}

pub async fn bridge(user: &dyn BridgeUser, guild_id: &str) -> Result<(), ApiError> {
    user.bridge_guild(guild_id, false).await.map_err(not_found)
}

/// Bridge the guild and every channel in it.
pub async fn join_entire(user: &dyn BridgeUser, guild_id: &str) -> Result<(), ApiError> {
    user.bridge_guild(guild_id, true).await.map_err(not_found)
}

pub async fn unbridge(user: &dyn BridgeUser, guild_id: &str) -> Result<(), ApiError> {
    user.unbridge_guild(guild_id).await.map_err(not_found)
}

fn not_found(e: crate::user::UserError) -> ApiError {
    ApiError::not_found(e.to_string(), errcode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::MemoryUser;

    #[tokio::test]
    async fn bridge_and_unbridge() {
        let user = MemoryUser::new("@u:server");
        user.add_guild("g1", "Guild One").await;

        bridge(&user, "g1").await.unwrap();
        assert!(list(&user).await[0].bridged);
        assert_eq!(user.guild_bridges_everything("g1").await, Some(false));

        unbridge(&user, "g1").await.unwrap();
        assert!(!list(&user).await[0].bridged);
    }

    #[tokio::test]
    async fn join_entire_bridges_everything() {
        let user = MemoryUser::new("@u:server");
        user.add_guild("g1", "Guild One").await;
        join_entire(&user, "g1").await.unwrap();
        assert_eq!(user.guild_bridges_everything("g1").await, Some(true));
    }

    #[tokio::test]
    async fn unknown_guild() {
        let user = MemoryUser::new("@u:server");
        let err = unbridge(&user, "nope").await.unwrap_err();
        assert_eq!(err.body().errcode, errcode::NOT_FOUND);
        assert_eq!(err.body().error, "guild nope not found");
    }
}
