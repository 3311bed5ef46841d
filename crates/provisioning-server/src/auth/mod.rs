//! Request authentication for the provisioning API.

mod caller;
mod gate;

pub use caller::Caller;
pub use gate::credential_gate;
