//! Synthesizer worker: the speech-synthesis back end.
//!
//! The synthesis engine and its streaming-audio socket protocol are a
//! black box behind [`SynthesisSink`]; this worker captures the launch
//! arguments and delegates.

use crate::config::ListenerConfig;
use crate::error::{PipelineError, Result};
use crate::queue::MessageQueue;
use crate::readiness::ReadinessFlag;
use crate::supervisor::{StopFlag, WorkerArgs};
use std::sync::Arc;

/// Boundary contract for the speech-synthesis back end.
///
/// Implementations pull refined text from the audio queue, synthesize
/// it, and stream the result to connected clients. The readiness flag
/// must be set once the listener is accepting connections; a `None`
/// from the queue or a stop request ends the serve loop.
pub trait SynthesisSink: Send + Sync + 'static {
    fn serve(&self, ctx: &SynthesizerContext) -> Result<()>;

    /// Name for logging/diagnostics.
    fn name(&self) -> &'static str {
        "synthesis-sink"
    }
}

/// Everything a synthesis sink needs to run.
pub struct SynthesizerContext {
    pub listener: ListenerConfig,
    pub tls: Option<Arc<rustls::ServerConfig>>,
    pub input: MessageQueue,
    pub ready: ReadinessFlag,
    pub stop: StopFlag,
}

/// Arguments captured at launch for the synthesizer worker.
#[derive(Clone)]
pub struct SynthesizerArgs {
    pub listener: ListenerConfig,
    pub tls: Option<Arc<rustls::ServerConfig>>,
    pub input: MessageQueue,
    pub ready: ReadinessFlag,
    pub sink: Arc<dyn SynthesisSink>,
}

/// Worker entry point for the synthesizer.
pub fn synthesizer_entry(args: WorkerArgs, stop: StopFlag) -> Result<()> {
    let WorkerArgs::Synthesizer(args) = args else {
        return Err(PipelineError::WorkerArgsMismatch {
            name: "synthesizer".to_string(),
        });
    };
    tracing::info!(
        bind = %args.listener.bind,
        port = args.listener.port,
        tls = args.tls.is_some(),
        "synthesizer running"
    );

    let ctx = SynthesizerContext {
        listener: args.listener.clone(),
        tls: args.tls.clone(),
        input: args.input.clone(),
        ready: args.ready.clone(),
        stop,
    };
    args.sink.serve(&ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use std::sync::Mutex;

    struct CollectingSink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl SynthesisSink for CollectingSink {
        fn serve(&self, ctx: &SynthesizerContext) -> Result<()> {
            ctx.ready.set_ready();
            while let Some(msg) = ctx.input.pull() {
                let mut seen = self.seen.lock().map_err(|_| {
                    PipelineError::Other("sink state poisoned".to_string())
                })?;
                seen.extend(msg.outputs);
            }
            Ok(())
        }
    }

    #[test]
    fn test_sink_drains_until_sentinel() {
        let input = MessageQueue::new();
        let ready = ReadinessFlag::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        input.push(Message::single("Hello world.", false));
        input.push(Message::single("Additionally, It rained.", true));
        input.close();

        let args = WorkerArgs::Synthesizer(SynthesizerArgs {
            listener: ListenerConfig {
                bind: "127.0.0.1".to_string(),
                port: 0,
            },
            tls: None,
            input: input.clone(),
            ready: ready.clone(),
            sink: Arc::new(CollectingSink { seen: seen.clone() }),
        });
        synthesizer_entry(args, StopFlag::new()).unwrap();

        assert!(ready.is_ready());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Hello world.", "Additionally, It rained."]
        );
    }
}
