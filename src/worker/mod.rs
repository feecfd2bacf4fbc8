//! Pipeline workers and the stage framework they run on.
//!
//! Each worker is a long-running loop on its own thread: pull from an
//! input queue (or accept client connections, for the two edge-facing
//! workers), do its unit of work, push results downstream. The ASR,
//! LLM and TTS engines themselves are black boxes behind traits.

pub mod error;
pub mod generator;
pub mod loopback;
pub mod refiner;
pub mod stage;
pub mod synthesizer;
pub mod transcriber;

pub use error::{ErrorReporter, LogReporter, StageError};
pub use generator::{
    EchoEngine, GenerationBackend, GenerationEngine, GeneratorArgs, GeneratorStage,
    generator_entry,
};
pub use loopback::{LineStreamSink, LineStreamSource};
pub use refiner::{RefinerArgs, RefinerStage, refiner_entry};
pub use stage::{Stage, run_stage};
pub use synthesizer::{SynthesisSink, SynthesizerArgs, SynthesizerContext, synthesizer_entry};
pub use transcriber::{TranscriberArgs, TranscriberContext, TranscriptionSource, transcriber_entry};
