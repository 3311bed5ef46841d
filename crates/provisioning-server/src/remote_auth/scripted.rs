//! A remote-auth provider that plays back a fixed script.
//!
//! Drives the development binary (from `[simulation]`) and the tests: it
//! emits the scripted codes one interval apart, waits one more interval,
//! then completes with the scripted outcome.

use super::{RemoteAuthClient, RemoteAuthError, RemoteAuthProvider, RemoteIdentity};
use crate::config::SimulationSection;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a scripted ceremony ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Identity(RemoteIdentity),
    /// Completes, but `result()` reports this error.
    Error(String),
    /// Never completes; only cancellation ends it.
    Hang,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub codes: Vec<String>,
    pub interval: Duration,
    pub outcome: Outcome,
    /// Make `dial` itself fail with this message.
    pub dial_error: Option<String>,
}

impl Script {
    pub fn succeed<I, S>(codes: I, user_id: &str, token: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            interval: Duration::from_millis(10),
            outcome: Outcome::Identity(RemoteIdentity {
                user_id: user_id.to_string(),
                token: token.to_string(),
            }),
            dial_error: None,
        }
    }

    pub fn from_simulation(sim: &SimulationSection) -> Self {
        Self {
            codes: sim.codes.clone(),
            interval: Duration::from_secs(sim.code_interval),
            outcome: Outcome::Identity(RemoteIdentity {
                user_id: sim.user_id.clone(),
                token: sim.token.clone(),
            }),
            dial_error: sim
                .fail
                .then(|| "simulated dial failure".to_string()),
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_dial_error(mut self, message: impl Into<String>) -> Self {
        self.dial_error = Some(message.into());
        self
    }
}

/// Hands out [`RemoteAuthClient`]s that follow the same script.
pub struct ScriptedProvider {
    script: Script,
    dials: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            dials: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `dial` calls made by all clients, failed ones included.
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

impl RemoteAuthProvider for ScriptedProvider {
    fn new_client(&self) -> Result<Box<dyn RemoteAuthClient>, RemoteAuthError> {
        Ok(Box::new(ScriptedClient {
            script: self.script.clone(),
            dials: self.dials.clone(),
            result: Arc::new(Mutex::new(None)),
            task: None,
        }))
    }
}

type ResultSlot = Arc<Mutex<Option<Result<RemoteIdentity, RemoteAuthError>>>>;

struct ScriptedClient {
    script: Script,
    dials: Arc<AtomicUsize>,
    result: ResultSlot,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl RemoteAuthClient for ScriptedClient {
    async fn dial(
        &mut self,
        cancel: CancellationToken,
        codes: mpsc::Sender<String>,
        done: oneshot::Sender<()>,
    ) -> Result<(), RemoteAuthError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.script.dial_error {
            return Err(RemoteAuthError::Connect(message.clone()));
        }

        let script = self.script.clone();
        let slot = self.result.clone();
        self.task = Some(tokio::spawn(async move {
            play(script, cancel, codes, done, slot).await;
        }));
        Ok(())
    }

    async fn result(&mut self) -> Result<RemoteIdentity, RemoteAuthError> {
        self.result.lock().take().unwrap_or(Err(RemoteAuthError::NoResult))
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn play(
    script: Script,
    cancel: CancellationToken,
    codes: mpsc::Sender<String>,
    done: oneshot::Sender<()>,
    slot: ResultSlot,
) {
    for (i, code) in script.codes.into_iter().enumerate() {
        if i > 0 && !pause(&cancel, script.interval).await {
            *slot.lock() = Some(Err(RemoteAuthError::Cancelled));
            return;
        }
        if codes.send(code).await.is_err() {
            debug!("code receiver gone, stopping script");
            return;
        }
    }
    drop(codes);

    if !pause(&cancel, script.interval).await {
        *slot.lock() = Some(Err(RemoteAuthError::Cancelled));
        return;
    }

    let result = match script.outcome {
        Outcome::Identity(identity) => Ok(identity),
        Outcome::Error(message) => Err(RemoteAuthError::Protocol(message)),
        Outcome::Hang => {
            cancel.cancelled().await;
            *slot.lock() = Some(Err(RemoteAuthError::Cancelled));
            return;
        }
    };
    *slot.lock() = Some(result);
    if done.send(()).is_err() {
        debug!("completion receiver gone");
    }
}

/// Sleep for `interval`; false if cancelled first.
async fn pause(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plays_codes_then_completes() {
        let provider = ScriptedProvider::new(Script::succeed(["A", "B"], "remote#1", "tok"));
        let mut client = provider.new_client().unwrap();
        let (codes_tx, mut codes_rx) = mpsc::channel(4);
        let (done_tx, done_rx) = oneshot::channel();

        client
            .dial(CancellationToken::new(), codes_tx, done_tx)
            .await
            .unwrap();
        assert_eq!(codes_rx.recv().await.as_deref(), Some("A"));
        assert_eq!(codes_rx.recv().await.as_deref(), Some("B"));
        assert_eq!(codes_rx.recv().await, None);
        done_rx.await.unwrap();

        let identity = client.result().await.unwrap();
        assert_eq!(identity.user_id, "remote#1");
        assert_eq!(provider.dial_count(), 1);
    }

    #[tokio::test]
    async fn dial_error_drops_both_senders() {
        let provider = ScriptedProvider::new(
            Script::succeed(["A"], "remote#1", "tok").with_dial_error("refused"),
        );
        let mut client = provider.new_client().unwrap();
        let (codes_tx, mut codes_rx) = mpsc::channel(4);
        let (done_tx, done_rx) = oneshot::channel();

        let err = client
            .dial(CancellationToken::new(), codes_tx, done_tx)
            .await
            .unwrap_err();
        assert_eq!(err, RemoteAuthError::Connect("refused".into()));
        assert_eq!(codes_rx.recv().await, None);
        assert!(done_rx.await.is_err());
    }

    #[tokio::test]
    async fn hang_ends_on_cancel() {
        let provider = ScriptedProvider::new(
            Script::succeed(Vec::<String>::new(), "x", "y").with_outcome(Outcome::Hang),
        );
        let mut client = provider.new_client().unwrap();
        let cancel = CancellationToken::new();
        let (codes_tx, _codes_rx) = mpsc::channel(4);
        let (done_tx, done_rx) = oneshot::channel();

        client.dial(cancel.clone(), codes_tx, done_tx).await.unwrap();
        cancel.cancel();
        assert!(done_rx.await.is_err());
        assert_eq!(client.result().await, Err(RemoteAuthError::Cancelled));
    }

    #[tokio::test]
    async fn result_before_completion_is_empty() {
        let provider = ScriptedProvider::new(Script::succeed(["A"], "x", "y"));
        let mut client = provider.new_client().unwrap();
        assert_eq!(client.result().await, Err(RemoteAuthError::NoResult));
    }
}
