//! The single merged event source a handshake waits on.

use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    PeerClosed,
    TimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::PeerClosed => f.write_str("peer closed"),
            CancelReason::TimedOut => f.write_str("timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginEvent {
    CodeReceived(String),
    /// The remote client dropped its code sender.
    CodeChannelClosed,
    /// Completion was signalled, or its sender was dropped.
    Completed,
    Cancelled(CancelReason),
}

/// Merges the code channel, the completion signal, the cancellation token
/// and the handshake deadline.
///
/// Sources are checked in a fixed order: cancellation, deadline, codes,
/// completion. Codes queued before completion are therefore always yielded
/// first. Completion is reported once.
pub struct LoginEvents {
    codes: mpsc::Receiver<String>,
    done: oneshot::Receiver<()>,
    cancel: CancellationToken,
    deadline: Instant,
    codes_open: bool,
    completed: bool,
}

impl LoginEvents {
    pub fn new(
        codes: mpsc::Receiver<String>,
        done: oneshot::Receiver<()>,
        cancel: CancellationToken,
        deadline: Instant,
    ) -> Self {
        Self {
            codes,
            done,
            cancel,
            deadline,
            codes_open: true,
            completed: false,
        }
    }

    pub async fn next(&mut self) -> LoginEvent {
        if self.cancel.is_cancelled() {
            return LoginEvent::Cancelled(CancelReason::PeerClosed);
        }
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => LoginEvent::Cancelled(CancelReason::PeerClosed),
            _ = sleep_until(self.deadline) => LoginEvent::Cancelled(CancelReason::TimedOut),
            code = self.codes.recv(), if self.codes_open => match code {
                Some(code) => LoginEvent::CodeReceived(code),
                None => {
                    self.codes_open = false;
                    LoginEvent::CodeChannelClosed
                }
            },
            _ = &mut self.done, if !self.completed => {
                self.completed = true;
                LoginEvent::Completed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn events(timeout: Duration) -> (
        mpsc::Sender<String>,
        oneshot::Sender<()>,
        CancellationToken,
        LoginEvents,
    ) {
        let (codes_tx, codes_rx) = mpsc::channel(8);
        let (done_tx, done_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let events = LoginEvents::new(codes_rx, done_rx, cancel.clone(), Instant::now() + timeout);
        (codes_tx, done_tx, cancel, events)
    }

    #[tokio::test]
    async fn buffered_codes_come_before_completion() {
        let (codes, done, _cancel, mut ev) = events(Duration::from_secs(5));
        codes.send("A".into()).await.unwrap();
        codes.send("B".into()).await.unwrap();
        done.send(()).unwrap();

        assert_eq!(ev.next().await, LoginEvent::CodeReceived("A".into()));
        assert_eq!(ev.next().await, LoginEvent::CodeReceived("B".into()));
        assert_eq!(ev.next().await, LoginEvent::Completed);
    }

    #[tokio::test]
    async fn closed_code_channel_reported_once() {
        let (codes, done, _cancel, mut ev) = events(Duration::from_secs(5));
        drop(codes);
        assert_eq!(ev.next().await, LoginEvent::CodeChannelClosed);

        done.send(()).unwrap();
        assert_eq!(ev.next().await, LoginEvent::Completed);
    }

    #[tokio::test]
    async fn dropped_done_sender_counts_as_completion() {
        let (codes, done, _cancel, mut ev) = events(Duration::from_secs(5));
        drop(codes);
        drop(done);
        assert_eq!(ev.next().await, LoginEvent::CodeChannelClosed);
        assert_eq!(ev.next().await, LoginEvent::Completed);
    }

    #[tokio::test]
    async fn completion_is_reported_once() {
        let (codes, done, _cancel, mut ev) = events(Duration::from_millis(50));
        done.send(()).unwrap();
        assert_eq!(ev.next().await, LoginEvent::Completed);

        codes.send("late".into()).await.unwrap();
        assert_eq!(ev.next().await, LoginEvent::CodeReceived("late".into()));
        assert_eq!(ev.next().await, LoginEvent::Cancelled(CancelReason::TimedOut));
    }

    #[tokio::test]
    async fn cancellation_wins() {
        let (codes, _done, cancel, mut ev) = events(Duration::from_secs(5));
        codes.send("A".into()).await.unwrap();
        cancel.cancel();
        assert_eq!(
            ev.next().await,
            LoginEvent::Cancelled(CancelReason::PeerClosed)
        );
    }

    #[tokio::test]
    async fn deadline_times_out() {
        let (_codes, _done, _cancel, mut ev) = events(Duration::from_millis(20));
        assert_eq!(ev.next().await, LoginEvent::Cancelled(CancelReason::TimedOut));
    }
}
