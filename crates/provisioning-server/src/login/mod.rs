//! Login handshake: state machine, merged event source, in-flight registry
//! and the orchestrator that drives them.

pub mod events;
pub mod machine;
pub mod orchestrator;
pub mod registry;

pub use events::{CancelReason, LoginEvent, LoginEvents};
pub use machine::{FailureCause, LoginMachine, LoginOutcome, LoginState, Step};
pub use orchestrator::{LoginOrchestrator, LoginPeer};
pub use registry::{HandshakeGuard, HandshakeRegistry};
