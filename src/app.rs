//! Composition root: validate launch options, wire the queues and
//! workers, run the supervisor until interrupted.

use crate::cli::Cli;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::queue::MessageQueue;
use crate::readiness::ReadinessFlag;
use crate::supervisor::{StopFlag, Supervisor, WorkerArgs, WorkerSpec};
use crate::tls;
use crate::worker::generator::{EchoEngine, GenerationBackend, GeneratorArgs, generator_entry};
use crate::worker::refiner::{RefinerArgs, refiner_entry};
use crate::worker::synthesizer::{SynthesizerArgs, synthesizer_entry};
use crate::worker::transcriber::{TranscriberArgs, transcriber_entry};
use crate::worker::{LineStreamSink, LineStreamSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to launch the pipeline, validated up front.
///
/// All validation happens here, before any worker is spawned: missing
/// required options, incomplete backend selections and absent TLS
/// material are startup errors that end the process with status 1.
#[derive(Debug)]
pub struct LaunchPlan {
    pub config: Config,
    pub asr_engine: PathBuf,
    pub backend: GenerationBackend,
    pub tls: Option<Arc<rustls::ServerConfig>>,
    pub poll_interval: Duration,
}

impl LaunchPlan {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        let asr_engine = cli
            .asr_engine
            .clone()
            .ok_or_else(|| PipelineError::MissingOption {
                option: "--asr-engine".to_string(),
            })?;

        if cli.mistral && cli.phi {
            return Err(PipelineError::ConflictingBackends);
        }
        let backend = if cli.mistral {
            GenerationBackend::Mistral {
                engine_path: require_backend_path(&cli.mistral_engine, "mistral", "--mistral-engine")?,
                tokenizer_path: require_backend_path(
                    &cli.mistral_tokenizer,
                    "mistral",
                    "--mistral-tokenizer",
                )?,
            }
        } else if cli.phi {
            GenerationBackend::Phi {
                engine_path: require_backend_path(&cli.phi_engine, "phi", "--phi-engine")?,
                tokenizer_path: require_backend_path(&cli.phi_tokenizer, "phi", "--phi-tokenizer")?,
            }
        } else {
            GenerationBackend::Builtin
        };

        let tls = if cli.tls {
            let cert = cli
                .tls_cert
                .as_deref()
                .ok_or_else(|| PipelineError::MissingOption {
                    option: "--tls-cert".to_string(),
                })?;
            let key = cli
                .tls_key
                .as_deref()
                .ok_or_else(|| PipelineError::MissingOption {
                    option: "--tls-key".to_string(),
                })?;
            let identity = tls::load_server_config(cert, key)?;
            tracing::info!("TLS identity loaded");
            Some(identity)
        } else {
            None
        };

        let poll_interval = cli
            .poll_interval
            .unwrap_or_else(|| config.supervisor.poll_interval());

        Ok(Self {
            config,
            asr_engine,
            backend,
            tls,
            poll_interval,
        })
    }
}

fn require_backend_path(
    value: &Option<PathBuf>,
    backend: &str,
    option: &str,
) -> Result<PathBuf> {
    value.clone().ok_or_else(|| PipelineError::BackendRequires {
        backend: backend.to_string(),
        option: option.to_string(),
    })
}

/// Wires the four queues and registers the four workers.
///
/// Data flow: transcriber → transcription queue → generator →
/// refine queue (plus the LLM tap) → refiner → audio queue →
/// synthesizer. Argument tuples are captured here once; restarts reuse
/// them verbatim.
pub fn launch_pipeline(
    supervisor: &mut Supervisor,
    plan: &LaunchPlan,
    ready: &ReadinessFlag,
) -> Result<()> {
    let transcription_queue = MessageQueue::new();
    let llm_queue = MessageQueue::new();
    let refine_queue = MessageQueue::new();
    let audio_queue = MessageQueue::new();

    supervisor.spawn(WorkerSpec::new(
        "transcriber",
        WorkerArgs::Transcriber(TranscriberArgs {
            listener: plan.config.transcriber.clone(),
            tls: plan.tls.clone(),
            engine_path: plan.asr_engine.clone(),
            out: transcription_queue.clone(),
            ready: ready.clone(),
            source: Arc::new(LineStreamSource),
        }),
        transcriber_entry,
    ))?;

    supervisor.spawn(WorkerSpec::new(
        "generator",
        WorkerArgs::Generator(GeneratorArgs {
            input: transcription_queue,
            refine_out: refine_queue.clone(),
            llm_tap: Some(llm_queue),
            backend: plan.backend.clone(),
            engine: Arc::new(EchoEngine),
        }),
        generator_entry,
    ))?;

    supervisor.spawn(WorkerSpec::new(
        "refiner",
        WorkerArgs::Refiner(RefinerArgs {
            input: refine_queue,
            output: audio_queue.clone(),
            config: plan.config.refine.clone(),
        }),
        refiner_entry,
    ))?;

    supervisor.spawn(WorkerSpec::new(
        "synthesizer",
        WorkerArgs::Synthesizer(SynthesizerArgs {
            listener: plan.config.synthesizer.clone().into(),
            tls: plan.tls.clone(),
            input: audio_queue,
            ready: ready.clone(),
            sink: Arc::new(LineStreamSink),
        }),
        synthesizer_entry,
    ))?;

    Ok(())
}

/// Runs the pipeline until an operator interrupt.
pub async fn run(cli: Cli) -> Result<()> {
    let plan = LaunchPlan::from_cli(&cli)?;
    let ready = ReadinessFlag::new();
    let mut supervisor = Supervisor::with_poll_interval(plan.poll_interval);

    if let Err(e) = launch_pipeline(&mut supervisor, &plan, &ready) {
        // Top-level fault during startup sequencing: take down whatever
        // already came up before surfacing the error.
        supervisor.terminate_all();
        return Err(e);
    }
    tracing::info!(
        backend = plan.backend.label(),
        tls = plan.tls.is_some(),
        "all services started"
    );

    run_supervised(supervisor, tokio::signal::ctrl_c()).await
}

/// Runs the supervisor on a blocking task until `interrupt` resolves.
///
/// Workers are terminated through the supervisor's run loop before this
/// returns, whether the interrupt arrived cleanly or the listener
/// itself failed; the listener failure then surfaces as the top-level
/// error.
async fn run_supervised(
    mut supervisor: Supervisor,
    interrupt: impl std::future::Future<Output = std::io::Result<()>>,
) -> Result<()> {
    let shutdown = StopFlag::new();
    let supervisor_shutdown = shutdown.clone();
    let supervisor_task =
        tokio::task::spawn_blocking(move || supervisor.run(supervisor_shutdown));

    let interrupt = interrupt.await;
    match &interrupt {
        Ok(()) => tracing::info!("received interrupt, shutting down"),
        Err(e) => tracing::error!("interrupt listener failed, shutting down: {e}"),
    }
    shutdown.request();

    supervisor_task
        .await
        .map_err(|e| PipelineError::Other(format!("supervisor task failed: {e}")))?;
    interrupt.map_err(PipelineError::Io)
}
