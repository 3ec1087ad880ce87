//! Depth tracking for nested dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};

/// How many requests are currently being dispatched.
#[derive(Debug, Default)]
pub(crate) struct Depth(AtomicUsize);

impl Depth {
    pub(crate) fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Enter one level. The level is left when the guard drops.
    pub(crate) fn enter(&self) -> DepthGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        DepthGuard(&self.0)
    }
}

/// Releases one level of [`Depth`] on drop, on every exit path.
#[must_use]
pub(crate) struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
