//! Cooperative cancellation of running traces.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cancellation token shared between the executing machine and whoever may ask it to stop
/// (typically a Ctrl+C handler).
///
/// [`crate::vm::execute`] polls the token once per step. A request is consumed by the run that
/// observes it, so the next run starts clean. Clones share the same flag.
///
/// ```rust
/// use malscope::vm::Interrupt;
///
/// let interrupt = Interrupt::new();
/// let handler = interrupt.clone();
/// handler.trigger();
///
/// assert!(interrupt.is_triggered());
/// assert!(interrupt.take());
/// assert!(!interrupt.take());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    requested: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create a token with no pending request.
    #[must_use]
    pub fn new() -> Self {
        Interrupt::default()
    }

    /// Request an interrupt. Safe to call from a signal handler thread.
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending request, returning whether there was one.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }

    /// Discard any pending request.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Returns `true` if a request is pending, without consuming it.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
