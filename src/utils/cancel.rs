//! Cancellation handles for in-flight streaming calls
//!
//! Cancellation is cooperative: the driving loop checks the handle between
//! chunks and stops pulling; dropping the abandoned stream closes the
//! underlying HTTP connection so vendors stop generating tokens.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Loops observing this handle stop as soon as they
    /// next check it; no further output is surfaced even if the socket stays
    /// open until natural completion.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_observed_by_clones() {
        let handle = CancelHandle::new();
        let observer = handle.clone();
        assert!(!observer.is_cancelled());
        handle.cancel();
        assert!(observer.is_cancelled());
    }
}
