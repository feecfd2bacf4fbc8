//! Transcriber worker: the speech-recognition front end.
//!
//! The actual ASR server (socket protocol, model inference) is a black
//! box behind [`TranscriptionSource`]. This worker owns the argument
//! capture and hands the source everything it needs: the listener
//! settings, optional TLS identity, the transcription queue, the
//! readiness flag and the stop flag.

use crate::config::ListenerConfig;
use crate::error::{PipelineError, Result};
use crate::queue::MessageQueue;
use crate::readiness::ReadinessFlag;
use crate::supervisor::{StopFlag, WorkerArgs};
use std::path::PathBuf;
use std::sync::Arc;

/// Boundary contract for the speech-recognition front end.
///
/// Implementations accept client connections on the configured
/// listener, transcribe incoming audio with the engine at
/// `ctx.engine_path`, and push [`crate::message::Message`]s onto the
/// transcription queue. The readiness flag must be set once the
/// listener is accepting connections, and the serve loop must observe
/// `ctx.stop` to exit on terminate.
pub trait TranscriptionSource: Send + Sync + 'static {
    fn serve(&self, ctx: &TranscriberContext) -> Result<()>;

    /// Name for logging/diagnostics.
    fn name(&self) -> &'static str {
        "transcription-source"
    }
}

/// Everything a transcription source needs to run.
pub struct TranscriberContext {
    pub listener: ListenerConfig,
    pub tls: Option<Arc<rustls::ServerConfig>>,
    pub engine_path: PathBuf,
    pub out: MessageQueue,
    pub ready: ReadinessFlag,
    pub stop: StopFlag,
}

/// Arguments captured at launch for the transcriber worker.
#[derive(Clone)]
pub struct TranscriberArgs {
    pub listener: ListenerConfig,
    pub tls: Option<Arc<rustls::ServerConfig>>,
    pub engine_path: PathBuf,
    pub out: MessageQueue,
    pub ready: ReadinessFlag,
    pub source: Arc<dyn TranscriptionSource>,
}

/// Worker entry point for the transcriber.
pub fn transcriber_entry(args: WorkerArgs, stop: StopFlag) -> Result<()> {
    let WorkerArgs::Transcriber(args) = args else {
        return Err(PipelineError::WorkerArgsMismatch {
            name: "transcriber".to_string(),
        });
    };
    tracing::info!(
        bind = %args.listener.bind,
        port = args.listener.port,
        tls = args.tls.is_some(),
        "transcriber running"
    );

    let ctx = TranscriberContext {
        listener: args.listener.clone(),
        tls: args.tls.clone(),
        engine_path: args.engine_path.clone(),
        out: args.out.clone(),
        ready: args.ready.clone(),
        stop,
    };
    args.source.serve(&ctx)
}
