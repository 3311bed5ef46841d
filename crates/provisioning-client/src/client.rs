//! REST side of the provisioning API.

use crate::error::{ClientError, ClientResult};
use crate::login::LoginSession;
use provisioning_core::{
    ErrorBody, GuildInfo, PingResponse, StatusResponse, DEFAULT_SUBPROTOCOL,
};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Client for one bridge user.
#[derive(Debug, Clone)]
pub struct ProvisioningClient {
    http: reqwest::Client,
    /// Scheme, host and route prefix, without a trailing slash.
    base_url: String,
    secret: String,
    user_id: String,
    protocol: String,
}

impl ProvisioningClient {
    /// `base_url` includes the route prefix, e.g.
    /// `http://127.0.0.1:29334/_matrix/provision/v1`.
    pub fn new(
        base_url: impl Into<String>,
        secret: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            user_id: user_id.into(),
            protocol: DEFAULT_SUBPROTOCOL.to_string(),
        }
    }

    /// Use a non-default subprotocol identifier for login.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn ping(&self) -> ClientResult<PingResponse> {
        json(self.get("/ping")).await
    }

    pub async fn disconnect(&self) -> ClientResult<StatusResponse> {
        json(self.post("/disconnect")).await
    }

    pub async fn reconnect(&self) -> ClientResult<StatusResponse> {
        json(self.post("/reconnect")).await
    }

    pub async fn logout(&self, force: bool) -> ClientResult<StatusResponse> {
        let req = self
            .post("/logout")
            .query(&[("force", if force { "true" } else { "false" })]);
        json(req).await
    }

    pub async fn guilds(&self) -> ClientResult<Vec<GuildInfo>> {
        json(self.get("/guilds")).await
    }

    pub async fn bridge_guild(&self, guild_id: &str) -> ClientResult<()> {
        empty(self.post(&format!("/guilds/{guild_id}/bridge"))).await
    }

    pub async fn unbridge_guild(&self, guild_id: &str) -> ClientResult<()> {
        empty(self.post(&format!("/guilds/{guild_id}/unbridge"))).await
    }

    pub async fn join_entire_guild(&self, guild_id: &str) -> ClientResult<()> {
        empty(self.post(&format!("/guilds/{guild_id}/joinentire"))).await
    }

    /// Open the login WebSocket, presenting the secret as a subprotocol.
    pub async fn login(&self) -> ClientResult<LoginSession> {
        let url = self.login_url()?;
        debug!(url = %url, "opening login socket");
        LoginSession::connect(url, &self.protocol, &self.secret).await
    }

    fn login_url(&self) -> ClientResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}/login", self.base_url))
            .map_err(|e| ClientError::Url(e.to_string()))?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => other,
        }
        .to_string();
        url.set_scheme(&scheme)
            .map_err(|_| ClientError::Url(format!("cannot use scheme {scheme}")))?;
        url.query_pairs_mut().append_pair("user_id", &self.user_id);
        Ok(url)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.get(format!("{}{path}", self.base_url)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.post(format!("{}{path}", self.base_url)))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.secret)
            .query(&[("user_id", self.user_id.as_str())])
    }
}

async fn json<T: DeserializeOwned>(req: RequestBuilder) -> ClientResult<T> {
    let resp = checked(req.send().await?).await?;
    Ok(resp.json::<T>().await?)
}

async fn empty(req: RequestBuilder) -> ClientResult<()> {
    checked(req.send().await?).await?;
    Ok(())
}

/// Turn a non-success status into [`ClientError::Api`].
async fn checked(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let bytes = resp.bytes().await?;
    match serde_json::from_slice::<ErrorBody>(&bytes) {
        Ok(body) => Err(ClientError::Api {
            status: status.as_u16(),
            body,
        }),
        Err(_) => Err(ClientError::Status(status.as_u16())),
    }
}
