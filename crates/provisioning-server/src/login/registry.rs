//! Tracks which users have a handshake in flight.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// At most one handshake per MXID.
#[derive(Debug, Clone, Default)]
pub struct HandshakeRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl HandshakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `mxid`; `None` if another handshake holds it.
    pub fn try_acquire(&self, mxid: &str) -> Option<HandshakeGuard> {
        let mut active = self.active.lock();
        if !active.insert(mxid.to_string()) {
            return None;
        }
        Some(HandshakeGuard {
            mxid: mxid.to_string(),
            active: self.active.clone(),
        })
    }

    pub fn is_active(&self, mxid: &str) -> bool {
        self.active.lock().contains(mxid)
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }
}

/// RAII guard that frees the user's slot on drop.
#[derive(Debug)]
pub struct HandshakeGuard {
    mxid: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for HandshakeGuard {
    fn drop(&mut self) {
        self.active.lock().remove(&self.mxid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_guard_per_user() {
        let registry = HandshakeRegistry::new();
        let guard = registry.try_acquire("@a:server").unwrap();
        assert!(registry.try_acquire("@a:server").is_none());
        assert!(registry.try_acquire("@b:server").is_some());
        assert!(registry.is_active("@a:server"));

        drop(guard);
        assert!(!registry.is_active("@a:server"));
        assert!(registry.try_acquire("@a:server").is_some());
    }

    #[test]
    fn guard_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let registry = HandshakeRegistry::new();
        let guard = registry.try_acquire("@a:server").unwrap();
        assert_send(&guard);
        assert_eq!(registry.len(), 1);
    }
}
