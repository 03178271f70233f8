//! Drop-time finalization events.
//!
//! Dropping the last reference to an owning handle can happen anywhere,
//! including while a foreign call is in flight higher up the stack. The drop
//! path therefore never calls into the foreign library: it pushes a
//! [`Finalization`] onto the library's [`FinalizationQueue`], and the queue
//! is drained by [`Foreign::collect`](crate::Foreign::collect) at points
//! where no call is active.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::memory::ForeignPtr;

/// A destructor that still has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalization {
    /// Name of the foreign type, for tracing.
    pub type_name: &'static str,
    /// Destructor export to invoke.
    pub destructor: &'static str,
    /// The pointer to release.
    pub ptr: ForeignPtr,
}

/// Shared queue of pending finalizations.
#[derive(Clone, Default)]
pub struct FinalizationQueue {
    pending: Arc<Mutex<Vec<Finalization>>>,
}

impl FinalizationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a finalization.
    pub fn push(&self, event: Finalization) {
        self.pending.lock().push(event);
    }

    /// Take every pending finalization, oldest first.
    pub fn drain(&self) -> Vec<Finalization> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of pending finalizations.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl std::fmt::Debug for FinalizationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizationQueue")
            .field("pending", &self.len())
            .finish()
    }
}
