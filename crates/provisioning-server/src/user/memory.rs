//! In-memory [`BridgeUser`] and [`UserDirectory`].
//!
//! Backs the development binary (seeded from `[[users]]`) and the tests.
//! Individual operations can be made to fail with [`MemoryUser::inject_failure`].

use super::{BridgeUser, UserDirectory, UserError, UserSnapshot};
use crate::config::UserSeed;
use async_trait::async_trait;
use chrono::Utc;
use provisioning_core::{ConnectionStats, GuildInfo};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Disconnect,
    Commit,
    Login,
    Logout,
}

#[derive(Debug, Clone)]
struct GuildEntry {
    name: String,
    bridged: bool,
    everything: bool,
}

#[derive(Debug, Default)]
struct UserState {
    remote_id: Option<String>,
    token: Option<String>,
    connected: bool,
    conn: Option<ConnectionStats>,
    management_room: String,
    guilds: BTreeMap<String, GuildEntry>,
    failures: HashSet<Operation>,
}

impl UserState {
    fn check(&self, op: Operation) -> Result<(), UserError> {
        if self.failures.contains(&op) {
            return Err(UserError::Upstream(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn open_session(&mut self) {
        let now = Utc::now();
        self.connected = true;
        self.conn = Some(ConnectionStats {
            last_heartbeat_ack: Some(now),
            last_heartbeat_sent: Some(now),
        });
    }

    fn close_session(&mut self) {
        self.connected = false;
        self.conn = None;
    }
}

/// A bridge user kept entirely in memory.
pub struct MemoryUser {
    mxid: String,
    state: RwLock<UserState>,
}

impl MemoryUser {
    /// A fresh user with no remote login.
    pub fn new(mxid: impl Into<String>) -> Self {
        Self {
            mxid: mxid.into(),
            state: RwLock::new(UserState::default()),
        }
    }

    /// Build a user from a `[[users]]` config entry.
    ///
    /// A seed carrying a token starts logged in and connected.
    pub fn from_seed(seed: &UserSeed) -> Self {
        let mut state = UserState {
            remote_id: seed.remote_id.clone(),
            token: seed.token.clone(),
            management_room: seed.management_room.clone(),
            ..Default::default()
        };
        if state.token.is_some() {
            state.open_session();
        }
        for guild in &seed.guilds {
            state.guilds.insert(
                guild.id.clone(),
                GuildEntry {
                    name: guild.name.clone(),
                    bridged: guild.bridged,
                    everything: false,
                },
            );
        }
        Self {
            mxid: seed.mxid.clone(),
            state: RwLock::new(state),
        }
    }

    /// Add a guild the user is a member of.
    pub async fn add_guild(&self, id: impl Into<String>, name: impl Into<String>) {
        let mut state = self.state.write().await;
        state.guilds.insert(
            id.into(),
            GuildEntry {
                name: name.into(),
                bridged: false,
                everything: false,
            },
        );
    }

    /// Make every later call of `op` fail with an upstream error.
    pub async fn inject_failure(&self, op: Operation) {
        self.state.write().await.failures.insert(op);
    }

    /// Credential stored by the last successful login.
    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    /// Whether a guild was bridged with all of its channels.
    pub async fn guild_bridges_everything(&self, guild_id: &str) -> Option<bool> {
        let state = self.state.read().await;
        state.guilds.get(guild_id).map(|g| g.bridged && g.everything)
    }
}

#[async_trait]
impl BridgeUser for MemoryUser {
    fn mxid(&self) -> &str {
        &self.mxid
    }

    async fn logged_in(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    async fn connected(&self) -> bool {
        self.state.read().await.connected
    }

    async fn snapshot(&self) -> UserSnapshot {
        let state = self.state.read().await;
        UserSnapshot {
            mxid: self.mxid.clone(),
            remote_id: state.remote_id.clone(),
            logged_in: state.token.is_some(),
            connected: state.connected,
            management_room: state.management_room.clone(),
            conn: state.conn.clone(),
        }
    }

    async fn connect(&self) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        state.check(Operation::Connect)?;
        if state.token.is_none() {
            return Err(UserError::NotLoggedIn);
        }
        state.open_session();
        info!(mxid = %self.mxid, "connected to remote service");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        state.check(Operation::Disconnect)?;
        if !state.connected {
            return Err(UserError::NotConnected);
        }
        state.close_session();
        info!(mxid = %self.mxid, "disconnected from remote service");
        Ok(())
    }

    async fn commit_remote_id(&self, remote_id: &str) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        state.check(Operation::Commit)?;
        state.remote_id = Some(remote_id.to_string());
        debug!(mxid = %self.mxid, remote_id, "remote identity committed");
        Ok(())
    }

    async fn login(&self, token: &str) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        state.check(Operation::Login)?;
        state.token = Some(token.to_string());
        state.open_session();
        info!(mxid = %self.mxid, "logged in to remote service");
        Ok(())
    }

    async fn logout(&self) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        state.check(Operation::Logout)?;
        state.token = None;
        state.remote_id = None;
        state.close_session();
        info!(mxid = %self.mxid, "logged out of remote service");
        Ok(())
    }

    async fn guilds(&self) -> Vec<GuildInfo> {
        let state = self.state.read().await;
        state
            .guilds
            .iter()
            .map(|(id, g)| GuildInfo {
                name: g.name.clone(),
                id: id.clone(),
                bridged: g.bridged,
            })
            .collect()
    }

    async fn bridge_guild(&self, guild_id: &str, everything: bool) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        let guild = state
            .guilds
            .get_mut(guild_id)
            .ok_or_else(|| UserError::GuildNotFound(guild_id.to_string()))?;
        guild.bridged = true;
        guild.everything = everything;
        info!(mxid = %self.mxid, guild_id, everything, "guild bridged");
        Ok(())
    }

    async fn unbridge_guild(&self, guild_id: &str) -> Result<(), UserError> {
        let mut state = self.state.write().await;
        let guild = state
            .guilds
            .get_mut(guild_id)
            .ok_or_else(|| UserError::GuildNotFound(guild_id.to_string()))?;
        guild.bridged = false;
        guild.everything = false;
        info!(mxid = %self.mxid, guild_id, "guild unbridged");
        Ok(())
    }
}

/// Fixed set of users keyed by MXID.
#[derive(Default)]
pub struct MemoryDirectory {
    users: HashMap<String, Arc<MemoryUser>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[UserSeed]) -> Self {
        let mut directory = Self::new();
        for seed in seeds {
            directory.insert(Arc::new(MemoryUser::from_seed(seed)));
        }
        directory
    }

    pub fn insert(&mut self, user: Arc<MemoryUser>) {
        self.users.insert(user.mxid().to_string(), user);
    }

    /// Concrete handle, for callers that need the in-memory extras.
    pub fn get(&self, mxid: &str) -> Option<Arc<MemoryUser>> {
        self.users.get(mxid).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn user_by_mxid(&self, mxid: &str) -> Option<Arc<dyn BridgeUser>> {
        self.users
            .get(mxid)
            .map(|u| u.clone() as Arc<dyn BridgeUser>)
    }
}
