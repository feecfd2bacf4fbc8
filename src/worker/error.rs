//! Stage-level failures and how they reach the log.

use thiserror::Error;

/// Failure raised while a stage processes one message.
///
/// An `Engine` failure is scoped to the message that caused it: the run
/// loop drops that message and keeps pulling. `BackendGone` means the
/// stage lost something it cannot run without; the loop exits and the
/// supervisor's next sweep restarts the worker.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// The engine rejected one fragment.
    #[error("engine rejected fragment {fragment:?}: {reason}")]
    Engine { fragment: String, reason: String },

    /// The stage's backend is no longer usable.
    #[error("backend unavailable: {reason}")]
    BackendGone { reason: String },
}

impl StageError {
    pub fn engine(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        StageError::Engine {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    pub fn backend_gone(reason: impl Into<String>) -> Self {
        StageError::BackendGone {
            reason: reason.into(),
        }
    }

    /// True when the stage's run loop must exit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::BackendGone { .. })
    }
}

/// Sink for stage errors, so the run loop stays decoupled from the log.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, stage: &str, error: &StageError);
}

/// Default reporter: per-message failures at warn, fatal ones at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, error: &StageError) {
        if error.is_fatal() {
            tracing::error!(stage, "{error}");
        } else {
            tracing::warn!(stage, "{error}");
        }
    }
}
