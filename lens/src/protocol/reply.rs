//! Asynchronous results of backend requests.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Resolution state of a [`PendingReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyState<T> {
    Pending,
    Success(T),
    Failed,
}

/// A result that a backend resolves later.
///
/// Clones share the same state: the backend keeps one handle to resolve it
/// and the browser polls another. A reply resolves once; later calls to
/// [`set_success`](Self::set_success) or [`set_failed`](Self::set_failed)
/// are ignored.
pub struct PendingReply<T> {
    state: Arc<Mutex<ReplyState<T>>>,
}

impl<T> PendingReply<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplyState::Pending)),
        }
    }

    /// An already resolved reply.
    pub fn success(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplyState::Success(value))),
        }
    }

    /// An already failed reply.
    pub fn failed() -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplyState::Failed)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReplyState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Resolve with a value. Returns false if already resolved.
    pub fn set_success(&self, value: T) -> bool {
        let mut state = self.lock();
        if !matches!(*state, ReplyState::Pending) {
            tracing::warn!("reply already resolved, ignoring value");
            return false;
        }
        *state = ReplyState::Success(value);
        true
    }

    /// Resolve as failed. Returns false if already resolved.
    pub fn set_failed(&self) -> bool {
        let mut state = self.lock();
        if !matches!(*state, ReplyState::Pending) {
            tracing::warn!("reply already resolved, ignoring failure");
            return false;
        }
        *state = ReplyState::Failed;
        true
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(*self.lock(), ReplyState::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(*self.lock(), ReplyState::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(*self.lock(), ReplyState::Failed)
    }
}

impl<T: Clone> PendingReply<T> {
    pub fn state(&self) -> ReplyState<T> {
        self.lock().clone()
    }

    /// The value, once resolved successfully.
    pub fn value(&self) -> Option<T> {
        match &*self.lock() {
            ReplyState::Success(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T> Clone for PendingReply<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for PendingReply<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for PendingReply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PendingReply").field(&*self.lock()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let reply = PendingReply::<String>::new();
        let handle = reply.clone();
        assert!(!reply.is_resolved());

        assert!(handle.set_success("album".to_string()));
        assert!(reply.is_success());
        assert_eq!(reply.value(), Some("album".to_string()));
    }

    #[test]
    fn test_resolves_once() {
        let reply = PendingReply::<()>::new();
        assert!(reply.set_failed());
        assert!(!reply.set_success(()));
        assert!(reply.is_failed());
        assert_eq!(reply.state(), ReplyState::Failed);
    }

    #[test]
    fn test_prebuilt_replies() {
        assert_eq!(PendingReply::success(3usize).value(), Some(3));
        assert!(PendingReply::<usize>::failed().is_failed());
    }
}
