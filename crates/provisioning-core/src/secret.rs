//! The process-wide provisioning shared secret.
//!
//! Injected into each server instance rather than read from global state,
//! so isolated instances can run side by side with different secrets.

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;

/// Shared secret every provisioning call must present.
#[derive(Clone)]
pub struct SharedSecret(Arc<str>);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::from(secret.into()))
    }

    /// Exact match against a caller-supplied token, in constant time.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_only() {
        let secret = SharedSecret::new("abc");
        assert!(secret.matches("abc"));
        assert!(!secret.matches("abcd"));
        assert!(!secret.matches("ab"));
        assert!(!secret.matches("ABC"));
        assert!(!secret.matches(""));
    }

    #[test]
    fn debug_is_redacted() {
        let secret = SharedSecret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
