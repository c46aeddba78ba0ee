//! Stream session tracking
//!
//! A newer streaming call supersedes any older in-flight one: the user sent a
//! new message before the previous reply finished. The tracker keeps the
//! single "current" session slot; chunks from a non-current session are
//! dropped before they can reach a callback. Beginning a new session and
//! checking currency share one mutex, so there is no window where two
//! sessions are simultaneously current.

use crate::utils::cancel::CancelHandle;
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

/// Opaque identifier of one streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream_{}", self.0.simple())
    }
}

/// Ephemeral record of the currently active streaming call.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub id: SessionId,
    pub cancel: CancelHandle,
}

/// Tracks which streaming call is currently live.
#[derive(Default)]
pub struct StreamSessionTracker {
    current: Mutex<Option<StreamSession>>,
}

impl StreamSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, atomically invalidating the previous one.
    ///
    /// The previous session's cancel handle is invoked before the new session
    /// is installed; at most one session is ever current.
    pub fn begin(&self) -> StreamSession {
        let session = StreamSession {
            id: SessionId(Uuid::new_v4()),
            cancel: CancelHandle::new(),
        };
        let mut current = self.current.lock().expect("session lock poisoned");
        if let Some(previous) = current.take() {
            tracing::debug!(superseded = %previous.id, by = %session.id, "superseding active stream session");
            previous.cancel.cancel();
        }
        *current = Some(session.clone());
        session
    }

    /// Whether `id` is still the current session.
    pub fn is_current(&self, id: SessionId) -> bool {
        self.current
            .lock()
            .expect("session lock poisoned")
            .as_ref()
            .is_some_and(|s| s.id == id)
    }

    /// Cancel and clear a session. No-op unless `id` is current.
    pub fn cancel(&self, id: SessionId) {
        let mut current = self.current.lock().expect("session lock poisoned");
        if current.as_ref().is_some_and(|s| s.id == id) {
            if let Some(session) = current.take() {
                session.cancel.cancel();
            }
        }
    }

    /// Clear the slot if `id` is still current, without cancelling. Called
    /// when a stream finishes naturally.
    pub fn finish(&self, id: SessionId) {
        let mut current = self.current.lock().expect("session lock poisoned");
        if current.as_ref().is_some_and(|s| s.id == id) {
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_supersedes_and_cancels_previous() {
        let tracker = StreamSessionTracker::new();
        let a = tracker.begin();
        assert!(tracker.is_current(a.id));

        let b = tracker.begin();
        assert!(!tracker.is_current(a.id));
        assert!(tracker.is_current(b.id));
        assert!(a.cancel.is_cancelled());
        assert!(!b.cancel.is_cancelled());
    }

    #[test]
    fn cancel_is_noop_for_stale_session() {
        let tracker = StreamSessionTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();

        tracker.cancel(a.id);
        // Cancelling the superseded session must not disturb the current one.
        assert!(tracker.is_current(b.id));
        assert!(!b.cancel.is_cancelled());

        tracker.cancel(b.id);
        assert!(!tracker.is_current(b.id));
        assert!(b.cancel.is_cancelled());
    }

    #[test]
    fn finish_clears_only_the_current_session() {
        let tracker = StreamSessionTracker::new();
        let a = tracker.begin();
        let b = tracker.begin();

        tracker.finish(a.id);
        assert!(tracker.is_current(b.id));

        tracker.finish(b.id);
        assert!(!tracker.is_current(b.id));
        // Natural completion does not flag cancellation.
        assert!(!b.cancel.is_cancelled());
    }
}
