//! Provisioning server: shared state, routes and the listen loop.
//!
//! Owns the injected shared secret, the user directory and the login
//! orchestrator. Every route sits behind the credential gate.

use crate::auth::{credential_gate, Caller};
use crate::commands;
use crate::config::ServerConfig;
use crate::login::LoginOrchestrator;
use crate::remote_auth::RemoteAuthProvider;
use crate::transport::DuplexChannel;
use crate::user::UserDirectory;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Router};
use provisioning_core::{ProvResult, ProvisioningError, SharedSecret};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// State shared by the gate and every handler.
#[derive(Clone)]
pub struct AppState {
    pub secret: SharedSecret,
    /// WebSocket subprotocol identifier.
    pub protocol: Arc<str>,
    pub directory: Arc<dyn UserDirectory>,
    pub orchestrator: Arc<LoginOrchestrator>,
}

pub struct ProvisioningServer {
    config: ServerConfig,
    state: AppState,
}

impl ProvisioningServer {
    pub fn new(
        config: ServerConfig,
        directory: Arc<dyn UserDirectory>,
        provider: Arc<dyn RemoteAuthProvider>,
    ) -> Self {
        let orchestrator = LoginOrchestrator::new(
            provider,
            config.code_timeout,
            Duration::from_secs(config.login_timeout),
        );
        let state = AppState {
            secret: config.shared_secret.clone(),
            protocol: Arc::from(config.protocol.as_str()),
            directory,
            orchestrator: Arc::new(orchestrator),
        };
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The full application, mounted under the configured prefix.
    pub fn router(&self) -> Router {
        let api = routes().route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            credential_gate,
        ));
        let app = if self.config.prefix.is_empty() {
            Router::new().merge(api)
        } else {
            Router::new().nest(&self.config.prefix, api)
        };
        app.with_state(self.state.clone())
    }

    /// Bind the configured address and serve until the future is dropped.
    pub async fn run(self) -> ProvResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ProvisioningError::Transport(format!("bind {addr} failed: {e}")))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> ProvResult<()> {
        let addr = listener.local_addr()?;
        info!(addr = %addr, prefix = %self.config.prefix, "provisioning API listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(commands::ping))
        .route("/login", get(login))
        .route("/logout", post(commands::logout))
        .route("/disconnect", post(commands::disconnect))
        .route("/reconnect", post(commands::reconnect))
        .route("/guilds", get(commands::list_guilds))
        .route("/guilds/{guild_id}/bridge", post(commands::bridge_guild))
        .route("/guilds/{guild_id}/unbridge", post(commands::unbridge_guild))
        .route("/guilds/{guild_id}/joinentire", post(commands::join_entire_guild))
}

/// `GET /login`: upgrade, then run the handshake over the socket.
async fn login(State(state): State<AppState>, caller: Caller, ws: WebSocketUpgrade) -> Response {
    let mxid = caller.user().mxid().to_string();
    let failed_mxid = mxid.clone();

    ws.protocols([state.protocol.to_string()])
        .on_failed_upgrade(move |e| {
            error!(mxid = %failed_mxid, error = %e, "failed to upgrade login connection");
        })
        .on_upgrade(move |socket| async move {
            debug!(mxid = %mxid, "started login via provisioning API");
            let cancel = CancellationToken::new();
            let mut channel = DuplexChannel::open(socket, cancel.clone());
            state
                .orchestrator
                .run(caller.user(), &mut channel, cancel)
                .await;
            channel.close().await;
        })
}
