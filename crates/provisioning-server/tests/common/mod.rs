#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use provisioning_client::ProvisioningClient;
use provisioning_server::config::{ConfigFile, ConfigOverrides};
use provisioning_server::remote_auth::{Script, ScriptedProvider};
use provisioning_server::user::{BridgeUser, MemoryDirectory, MemoryUser};
use provisioning_server::{AppState, ProvisioningServer, ServerConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const SECRET: &str = "s3cret";
pub const PREFIX: &str = "/_matrix/provision/v1";
pub const MXID: &str = "@alice:example.org";
pub const MANAGEMENT_ROOM: &str = "!mgmt:example.org";

pub fn config() -> ServerConfig {
    ServerConfig::resolve(
        ConfigFile::default(),
        ConfigOverrides {
            shared_secret: Some(SECRET.to_string()),
            ..Default::default()
        },
    )
    .unwrap()
}

pub struct Harness {
    pub user: Arc<MemoryUser>,
    pub provider: Arc<ScriptedProvider>,
    server: ProvisioningServer,
}

impl Harness {
    pub async fn new(script: Script) -> Self {
        let user = Arc::new(MemoryUser::from_seed(&provisioning_server::config::UserSeed {
            mxid: MXID.to_string(),
            management_room: MANAGEMENT_ROOM.to_string(),
            remote_id: None,
            token: None,
            guilds: Vec::new(),
        }));
        user.add_guild("g1", "Guild One").await;
        user.add_guild("g2", "Guild Two").await;

        let mut directory = MemoryDirectory::new();
        directory.insert(user.clone());
        let provider = Arc::new(ScriptedProvider::new(script));
        let server = ProvisioningServer::new(config(), Arc::new(directory), provider.clone());
        Self {
            user,
            provider,
            server,
        }
    }

    /// A user already logged in as `remote#1`.
    pub async fn logged_in() -> Self {
        let harness = Self::new(Script::succeed(["unused"], "remote#1", "tok")).await;
        harness.user.commit_remote_id("remote#1").await.unwrap();
        harness.user.login("tok").await.unwrap();
        harness
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Serve on an ephemeral port.
    pub async fn spawn(self) -> Running {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = self.server.state().clone();
        tokio::spawn(self.server.serve(listener));
        Running {
            base_url: format!("http://{addr}{PREFIX}"),
            user: self.user,
            provider: self.provider,
            state,
        }
    }
}

pub struct Running {
    pub base_url: String,
    pub user: Arc<MemoryUser>,
    pub provider: Arc<ScriptedProvider>,
    pub state: AppState,
}

impl Running {
    pub fn client(&self) -> ProvisioningClient {
        ProvisioningClient::new(&self.base_url, SECRET, MXID)
    }

    pub fn client_with_secret(&self, secret: &str) -> ProvisioningClient {
        ProvisioningClient::new(&self.base_url, secret, MXID)
    }

    /// Wait until no handshake is in flight.
    pub async fn handshakes_settled(&self) {
        within(async {
            while !self.state.orchestrator.registry().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }
}

/// Fail the test instead of hanging.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

pub fn request(method: &str, path: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(format!("{PREFIX}{path}"));
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn authed(method: &str, path: &str) -> Request<Body> {
    let sep = if path.contains('?') { '&' } else { '?' };
    request(
        method,
        &format!("{path}{sep}user_id={MXID}"),
        Some(&format!("Bearer {SECRET}")),
    )
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
