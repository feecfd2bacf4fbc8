//! voxflow - Streaming speech-to-speech pipeline orchestrator
//!
//! Transcriber → generator → refiner → synthesizer, connected by
//! unbounded message queues and kept alive by a polling supervisor.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod message;
pub mod queue;
pub mod readiness;
pub mod refine;
pub mod supervisor;
pub mod tls;
pub mod worker;

// Pipeline plumbing
pub use message::Message;
pub use queue::MessageQueue;
pub use readiness::ReadinessFlag;

// Refinement
pub use refine::{HistoryBuffer, RefineConfig, RefineEngine, normalize};

// Supervision
pub use supervisor::{StopFlag, Supervisor, WorkerArgs, WorkerSpec, WorkerState};

// Worker boundary traits (engines are black boxes behind these)
pub use worker::{GenerationEngine, Stage, SynthesisSink, TranscriptionSource};

// Error handling
pub use error::{PipelineError, Result};

// Config
pub use config::{Config, ListenerConfig};
