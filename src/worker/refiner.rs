//! Refiner stage: text continuity between generation and synthesis.

use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::refine::{RefineConfig, RefineEngine};
use crate::supervisor::{StopFlag, WorkerArgs};
use crate::worker::error::{ErrorReporter, LogReporter, StageError};
use crate::worker::stage::{Stage, run_stage};
use std::sync::Arc;

/// Arguments captured at launch for the refiner worker.
#[derive(Clone)]
pub struct RefinerArgs {
    /// Refine queue (input edge).
    pub input: MessageQueue,
    /// Audio queue (output edge, feeds the synthesizer).
    pub output: MessageQueue,
    /// Engine tuning.
    pub config: RefineConfig,
}

/// Stage wrapper around the refine engine.
///
/// For each pulled message the fragments are refined in order, every
/// refined string is recorded into the history window, and one outgoing
/// message is emitted with the input's `eos` passed through unchanged.
pub struct RefinerStage {
    engine: RefineEngine,
}

impl RefinerStage {
    pub fn new(config: RefineConfig) -> Self {
        Self {
            engine: RefineEngine::new(config),
        }
    }
}

impl Stage for RefinerStage {
    fn process(&mut self, input: Message) -> std::result::Result<Option<Message>, StageError> {
        let mut refined_outputs = Vec::with_capacity(input.outputs.len());
        for fragment in &input.outputs {
            let refined = self.engine.refine(fragment);
            self.engine.record(&refined);
            tracing::info!(refined = %refined, "refined output");
            refined_outputs.push(refined);
        }
        Ok(Some(Message::new(refined_outputs, input.eos)))
    }

    fn name(&self) -> &'static str {
        "refiner"
    }
}

/// Worker entry point for the refiner stage.
///
/// The history window is created empty here, so a restart starts from a
/// clean slate; history is never persisted.
pub fn refiner_entry(args: WorkerArgs, stop: StopFlag) -> Result<()> {
    let WorkerArgs::Refiner(args) = args else {
        return Err(PipelineError::WorkerArgsMismatch {
            name: "refiner".to_string(),
        });
    };
    tracing::info!(
        max_history = args.config.max_history,
        "refinement service running"
    );

    let stage = RefinerStage::new(args.config.clone());
    let reporter: Arc<dyn ErrorReporter> = Arc::new(LogReporter);
    run_stage(
        stage,
        &args.input,
        std::slice::from_ref(&args.output),
        &stop,
        &reporter,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refines_fragments_in_order() {
        let mut stage = RefinerStage::new(RefineConfig::default());
        let out = stage
            .process(Message::new(
                vec!["hello world".to_string(), "it was raining".to_string()],
                false,
            ))
            .unwrap()
            .unwrap();
        // Second fragment sees the first in history: terminal context,
        // no connective opener, so it gets the new-thought prefix.
        assert_eq!(
            out.outputs,
            vec!["Hello world.", "Additionally, It was raining."]
        );
    }

    #[test]
    fn test_eos_passes_through_unchanged() {
        let mut stage = RefinerStage::new(RefineConfig::default());
        let open = stage
            .process(Message::single("first", false))
            .unwrap()
            .unwrap();
        assert!(!open.eos);
        let closing = stage
            .process(Message::single("but then more", true))
            .unwrap()
            .unwrap();
        assert!(closing.eos);
    }

    #[test]
    fn test_history_carries_across_messages() {
        let mut stage = RefinerStage::new(RefineConfig::default());
        let first = stage
            .process(Message::single("the sky is blue", false))
            .unwrap()
            .unwrap();
        assert_eq!(first.outputs, vec!["The sky is blue."]);

        // Verbatim repeat in the next message is suppressed by the
        // substring check against recorded history.
        let second = stage
            .process(Message::single("the sky is blue", false))
            .unwrap()
            .unwrap();
        assert_eq!(second.outputs, vec!["The sky is blue."]);
    }

    #[test]
    fn test_empty_message_yields_empty_refined_message() {
        let mut stage = RefinerStage::new(RefineConfig::default());
        let out = stage
            .process(Message::new(vec![], true))
            .unwrap()
            .unwrap();
        assert!(out.outputs.is_empty());
        assert!(out.eos);
    }

    #[test]
    fn test_entry_rejects_wrong_args() {
        use crate::worker::generator::{EchoEngine, GenerationBackend, GeneratorArgs};

        let args = WorkerArgs::Generator(GeneratorArgs {
            input: MessageQueue::new(),
            refine_out: MessageQueue::new(),
            llm_tap: None,
            backend: GenerationBackend::Builtin,
            engine: Arc::new(EchoEngine),
        });
        let err = refiner_entry(args, StopFlag::new()).unwrap_err();
        assert!(matches!(err, PipelineError::WorkerArgsMismatch { .. }));
    }
}
