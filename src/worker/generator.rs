//! Language-model generation stage.
//!
//! The inference engine itself is a black box behind the
//! [`GenerationEngine`] trait; this stage owns only the queue plumbing
//! around it: pull a transcription message, generate a response for
//! each fragment, push the result onto the refine queue and the
//! optional LLM tap.

use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::supervisor::{StopFlag, WorkerArgs};
use crate::worker::error::{LogReporter, StageError};
use crate::worker::stage::{Stage, run_stage};
use std::path::PathBuf;
use std::sync::Arc;

/// Which generation backend the pipeline was launched with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationBackend {
    /// No external model; the built-in loopback engine.
    #[default]
    Builtin,
    /// Mistral engine with its tokenizer.
    Mistral {
        engine_path: PathBuf,
        tokenizer_path: PathBuf,
    },
    /// Phi engine with its tokenizer.
    Phi {
        engine_path: PathBuf,
        tokenizer_path: PathBuf,
    },
}

impl GenerationBackend {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            GenerationBackend::Builtin => "builtin",
            GenerationBackend::Mistral { .. } => "mistral",
            GenerationBackend::Phi { .. } => "phi",
        }
    }
}

/// Boundary contract for language-model inference.
pub trait GenerationEngine: Send + Sync + 'static {
    /// Generates zero-or-more response fragments for a prompt.
    fn generate(&self, prompt: &str) -> std::result::Result<Vec<String>, StageError>;

    /// Name for logging/diagnostics.
    fn name(&self) -> &'static str {
        "generation-engine"
    }
}

/// Loopback engine that echoes the prompt back, for local runs and
/// tests when no real model backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoEngine;

impl GenerationEngine for EchoEngine {
    fn generate(&self, prompt: &str) -> std::result::Result<Vec<String>, StageError> {
        Ok(vec![prompt.to_string()])
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Arguments captured at launch for the generator worker.
#[derive(Clone)]
pub struct GeneratorArgs {
    /// Transcription queue (input edge).
    pub input: MessageQueue,
    /// Refine queue (primary output edge).
    pub refine_out: MessageQueue,
    /// Optional secondary queue for non-pipeline LLM consumers.
    pub llm_tap: Option<MessageQueue>,
    /// Backend selection, carried for logging and restart fidelity.
    pub backend: GenerationBackend,
    /// The inference engine.
    pub engine: Arc<dyn GenerationEngine>,
}

/// Stage adapter around a generation engine.
pub struct GeneratorStage {
    engine: Arc<dyn GenerationEngine>,
}

impl GeneratorStage {
    pub fn new(engine: Arc<dyn GenerationEngine>) -> Self {
        Self { engine }
    }
}

impl Stage for GeneratorStage {
    fn process(&mut self, input: Message) -> std::result::Result<Option<Message>, StageError> {
        let mut outputs = Vec::new();
        for prompt in &input.outputs {
            outputs.extend(self.engine.generate(prompt)?);
        }
        Ok(Some(Message::new(outputs, input.eos)))
    }

    fn name(&self) -> &'static str {
        "generator"
    }
}

/// Worker entry point for the generator stage.
pub fn generator_entry(args: WorkerArgs, stop: StopFlag) -> Result<()> {
    let WorkerArgs::Generator(args) = args else {
        return Err(PipelineError::WorkerArgsMismatch {
            name: "generator".to_string(),
        });
    };
    tracing::info!(backend = args.backend.label(), "generator running");

    let mut outputs = vec![args.refine_out.clone()];
    if let Some(tap) = &args.llm_tap {
        outputs.push(tap.clone());
    }

    let stage = GeneratorStage::new(args.engine.clone());
    run_stage(stage, &args.input, &outputs, &stop, &reporter());
    Ok(())
}

fn reporter() -> Arc<dyn crate::worker::error::ErrorReporter> {
    Arc::new(LogReporter)
}
