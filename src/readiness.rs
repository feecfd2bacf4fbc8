//! Shared readiness flag for the edge-facing listeners.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "a front-end listener is accepting connections" flag.
///
/// Written by the transcriber and synthesizer workers once their
/// listeners are up; readable by anyone. Writes only ever set the flag
/// to true, so relaxed ordering is sufficient: nothing beyond eventual
/// visibility is promised or needed.
#[derive(Clone, Debug, Default)]
pub struct ReadinessFlag(Arc<AtomicBool>);

impl ReadinessFlag {
    /// Creates a flag in the not-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a listener as ready. Idempotent.
    pub fn set_ready(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once any listener has reported ready.
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
