//! Drives one login handshake from admission to a terminal state.

use super::events::LoginEvents;
use super::machine::{FailureCause, Input, LoginMachine, LoginOutcome, Step};
use super::registry::HandshakeRegistry;
use crate::remote_auth::{RemoteAuthClient, RemoteAuthError, RemoteAuthProvider, RemoteIdentity};
use crate::user::{BridgeUser, UserError};
use async_trait::async_trait;
use provisioning_core::{LoginMessage, ProvResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Bounded buffer between the remote client and the orchestrator.
const CODE_BUFFER: usize = 16;

/// Where handshake frames go. Implemented by the duplex channel.
#[async_trait]
pub trait LoginPeer: Send {
    async fn send(&mut self, msg: &LoginMessage) -> ProvResult<()>;
}

pub struct LoginOrchestrator {
    provider: Arc<dyn RemoteAuthProvider>,
    registry: HandshakeRegistry,
    code_timeout: u64,
    login_timeout: Duration,
}

impl LoginOrchestrator {
    /// `code_timeout` is the advisory display time sent with each code, in
    /// seconds; `login_timeout` bounds the whole handshake.
    pub fn new(
        provider: Arc<dyn RemoteAuthProvider>,
        code_timeout: u64,
        login_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            registry: HandshakeRegistry::new(),
            code_timeout,
            login_timeout,
        }
    }

    pub fn registry(&self) -> &HandshakeRegistry {
        &self.registry
    }

    /// Run a handshake for `user`, writing frames to `peer`.
    ///
    /// `cancel` fires when the peer goes away. It is also cancelled when this
    /// returns so the remote client always stops. The session is mutated only
    /// on the success path.
    pub async fn run<P>(
        &self,
        user: &dyn BridgeUser,
        peer: &mut P,
        cancel: CancellationToken,
    ) -> LoginOutcome
    where
        P: LoginPeer + ?Sized,
    {
        let _stop_remote = cancel.clone().drop_guard();
        let mxid = user.mxid();
        let mut machine = LoginMachine::new();

        // The slot is held across the session read.
        let slot = self.registry.try_acquire(mxid);
        let in_flight = slot.is_none();
        let logged_in = user.logged_in().await;
        match machine.on(Input::Begin {
            logged_in,
            in_flight,
        }) {
            Step::Dial => {}
            step => return self.settle(peer, mxid, step).await,
        }

        debug!(mxid, "dialing remote auth");
        let deadline = handshake_deadline(Instant::now(), self.login_timeout);
        let (mut client, mut events) = match self.dial(&cancel, deadline).await {
            Ok(dialed) => dialed,
            Err(e) => {
                error!(mxid, error = %e, "failed to start remote auth");
                let step = machine.on(Input::DialFailed);
                return self.settle(peer, mxid, step).await;
            }
        };
        machine.on(Input::Dialed);
        debug!(mxid, "awaiting remote auth completion");

        loop {
            let event = events.next().await;
            match machine.on(Input::Event(event)) {
                Step::SendCode(code) => self.send_code(peer, mxid, code).await,
                Step::FetchResult => break,
                Step::Await => {}
                step => return self.settle(peer, mxid, step).await,
            }
        }

        let identity = match client.result().await {
            Ok(identity) => identity,
            Err(e) => {
                error!(mxid, error = %e, "remote auth completed with an error");
                let step = machine.on(Input::ResultFailed);
                return self.settle(peer, mxid, step).await;
            }
        };
        match machine.on(Input::ResultReady {
            cancelled: cancel.is_cancelled(),
        }) {
            Step::Finalize => {}
            step => return self.settle(peer, mxid, step).await,
        }

        let step = match finalize(user, &identity).await {
            Ok(()) => machine.on(Input::Finalized {
                remote_id: identity.user_id,
            }),
            Err(e) => {
                error!(mxid, error = %e, "failed to finish login");
                machine.on(Input::FinalizeFailed)
            }
        };
        self.settle(peer, mxid, step).await
    }

    async fn dial(
        &self,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<(Box<dyn RemoteAuthClient>, LoginEvents), RemoteAuthError> {
        let mut client = self.provider.new_client()?;
        let (codes_tx, codes_rx) = mpsc::channel(CODE_BUFFER);
        let (done_tx, done_rx) = oneshot::channel();
        client.dial(cancel.clone(), codes_tx, done_tx).await?;
        let events = LoginEvents::new(codes_rx, done_rx, cancel.clone(), deadline);
        Ok((client, events))
    }

    async fn send_code<P>(&self, peer: &mut P, mxid: &str, code: String)
    where
        P: LoginPeer + ?Sized,
    {
        debug!(mxid, "forwarding delivery code");
        if let Err(e) = peer.send(&LoginMessage::code(code, self.code_timeout)).await {
            debug!(mxid, error = %e, "failed to send code to peer");
        }
    }

    async fn settle<P>(&self, peer: &mut P, mxid: &str, step: Step) -> LoginOutcome
    where
        P: LoginPeer + ?Sized,
    {
        let outcome = match step {
            Step::Done(outcome) => outcome,
            other => {
                error!(mxid, step = ?other, "login handshake stopped in a non-terminal step");
                LoginOutcome::Failed(FailureCause::Internal)
            }
        };
        if let Some(msg) = outcome.message() {
            if let Err(e) = peer.send(&msg).await {
                debug!(mxid, error = %e, "failed to send terminal frame to peer");
            }
        }
        info!(mxid, outcome = %outcome, "login handshake finished");
        outcome
    }
}

/// Cap for deadlines that would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn handshake_deadline(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Commit the identity, then finish login with its credential.
async fn finalize(user: &dyn BridgeUser, identity: &RemoteIdentity) -> Result<(), UserError> {
    user.commit_remote_id(&identity.user_id).await?;
    user.login(&identity.token).await
}
