//! Transition table of a login handshake.
//!
//! [`LoginMachine`] knows nothing about channels, sockets or tasks: it is fed
//! [`Input`]s by the orchestrator and answers with the [`Step`] to perform.

use super::events::{CancelReason, LoginEvent};
use provisioning_core::{errcode, LoginMessage};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Dialing,
    AwaitingCompletion,
    Succeeded,
    Failed,
    Cancelled,
}

impl LoginState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoginState::Succeeded | LoginState::Failed | LoginState::Cancelled
        )
    }
}

/// Why a handshake ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    AlreadyLoggedIn,
    LoginInProgress,
    /// The remote client could not be created or dialed.
    DialFailed,
    /// The remote side completed with an error.
    ResultFailed,
    /// Committing the identity or finishing login failed.
    FinalizeFailed,
    /// The driver fed an input the current state does not accept.
    Internal,
}

impl FailureCause {
    /// Terminal frame sent to the peer.
    pub fn message(self) -> LoginMessage {
        match self {
            FailureCause::AlreadyLoggedIn => {
                LoginMessage::failure("You're already logged into Discord", errcode::ALREADY_LOGGED_IN)
            }
            FailureCause::LoginInProgress => LoginMessage::failure(
                "A login for this account is already in progress",
                errcode::LOGIN_IN_PROGRESS,
            ),
            FailureCause::DialFailed
            | FailureCause::ResultFailed
            | FailureCause::FinalizeFailed
            | FailureCause::Internal => LoginMessage::connection_error(),
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureCause::AlreadyLoggedIn => "already logged in",
            FailureCause::LoginInProgress => "login in progress",
            FailureCause::DialFailed => "dial failed",
            FailureCause::ResultFailed => "remote result failed",
            FailureCause::FinalizeFailed => "finalizing login failed",
            FailureCause::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// How a handshake ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Succeeded { remote_id: String },
    Failed(FailureCause),
    Cancelled(CancelReason),
}

impl LoginOutcome {
    /// The terminal frame for this outcome; cancelled handshakes send none.
    pub fn message(&self) -> Option<LoginMessage> {
        match self {
            LoginOutcome::Succeeded { remote_id } => Some(LoginMessage::success(remote_id.clone())),
            LoginOutcome::Failed(cause) => Some(cause.message()),
            LoginOutcome::Cancelled(_) => None,
        }
    }
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginOutcome::Succeeded { remote_id } => write!(f, "succeeded as {remote_id}"),
            LoginOutcome::Failed(cause) => write!(f, "failed: {cause}"),
            LoginOutcome::Cancelled(reason) => write!(f, "cancelled: {reason}"),
        }
    }
}

/// What the driver observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Begin { logged_in: bool, in_flight: bool },
    Dialed,
    DialFailed,
    Event(LoginEvent),
    ResultFailed,
    /// A result is in hand; `cancelled` is the token's state at that moment.
    ResultReady { cancelled: bool },
    Finalized { remote_id: String },
    FinalizeFailed,
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Dial,
    /// Keep consuming events.
    Await,
    SendCode(String),
    FetchResult,
    /// Commit the identity and finish login.
    Finalize,
    Done(LoginOutcome),
}

#[derive(Debug)]
pub struct LoginMachine {
    state: LoginState,
    completed: bool,
}

impl Default for LoginMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginMachine {
    pub fn new() -> Self {
        Self {
            state: LoginState::Idle,
            completed: false,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn on(&mut self, input: Input) -> Step {
        use LoginState::*;

        match (self.state, input) {
            (Idle, Input::Begin { logged_in: true, .. }) => {
                self.fail(FailureCause::AlreadyLoggedIn)
            }
            (Idle, Input::Begin { in_flight: true, .. }) => {
                self.fail(FailureCause::LoginInProgress)
            }
            (Idle, Input::Begin { .. }) => {
                self.state = Dialing;
                Step::Dial
            }

            (Dialing, Input::Dialed) => {
                self.state = AwaitingCompletion;
                Step::Await
            }
            (Dialing, Input::DialFailed) => self.fail(FailureCause::DialFailed),
            (Dialing, Input::Event(LoginEvent::Cancelled(reason))) => self.cancel(reason),

            (AwaitingCompletion, Input::Event(event)) if !self.completed => match event {
                LoginEvent::CodeReceived(code) => Step::SendCode(code),
                LoginEvent::CodeChannelClosed => Step::Await,
                LoginEvent::Completed => {
                    self.completed = true;
                    Step::FetchResult
                }
                LoginEvent::Cancelled(reason) => self.cancel(reason),
            },
            (AwaitingCompletion, Input::ResultFailed) if self.completed => {
                self.fail(FailureCause::ResultFailed)
            }
            (AwaitingCompletion, Input::ResultReady { cancelled: true }) if self.completed => {
                self.cancel(CancelReason::PeerClosed)
            }
            (AwaitingCompletion, Input::ResultReady { cancelled: false }) if self.completed => {
                Step::Finalize
            }
            (AwaitingCompletion, Input::Finalized { remote_id }) if self.completed => {
                self.state = Succeeded;
                Step::Done(LoginOutcome::Succeeded { remote_id })
            }
            (AwaitingCompletion, Input::FinalizeFailed) if self.completed => {
                self.fail(FailureCause::FinalizeFailed)
            }

            (state, _) if state.is_terminal() => Step::Await,
            (_, _) => self.fail(FailureCause::Internal),
        }
    }

    fn fail(&mut self, cause: FailureCause) -> Step {
        self.state = LoginState::Failed;
        Step::Done(LoginOutcome::Failed(cause))
    }

    fn cancel(&mut self, reason: CancelReason) -> Step {
        self.state = LoginState::Cancelled;
        Step::Done(LoginOutcome::Cancelled(reason))
    }
}
