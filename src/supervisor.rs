//! Pipeline supervisor: launches the workers, polls their liveness,
//! restarts the dead with their original arguments, and coordinates
//! shutdown.

use crate::error::{PipelineError, Result};
use crate::queue::MessageQueue;
use crate::worker::{GeneratorArgs, RefinerArgs, SynthesizerArgs, TranscriberArgs};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default liveness polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long terminate waits for worker threads before detaching them.
const JOIN_DEADLINE: Duration = Duration::from_secs(1);

/// Slice length for interruptible sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cooperative stop signal handed to every worker on spawn.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Idempotent.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The argument tuple captured for a worker at launch.
///
/// Immutable once captured: a restart reuses the very same value, so
/// restarting is idempotent with respect to configuration.
#[derive(Clone)]
pub enum WorkerArgs {
    Transcriber(TranscriberArgs),
    Generator(GeneratorArgs),
    Refiner(RefinerArgs),
    Synthesizer(SynthesizerArgs),
}

impl WorkerArgs {
    /// Which stage these arguments belong to.
    pub fn stage_name(&self) -> &'static str {
        match self {
            WorkerArgs::Transcriber(_) => "transcriber",
            WorkerArgs::Generator(_) => "generator",
            WorkerArgs::Refiner(_) => "refiner",
            WorkerArgs::Synthesizer(_) => "synthesizer",
        }
    }

    /// The queue whose sentinel unblocks this worker on terminate.
    ///
    /// The transcriber has no input queue; it is stopped through its
    /// stop flag alone.
    pub fn primary_input(&self) -> Option<&MessageQueue> {
        match self {
            WorkerArgs::Transcriber(_) => None,
            WorkerArgs::Generator(args) => Some(&args.input),
            WorkerArgs::Refiner(args) => Some(&args.input),
            WorkerArgs::Synthesizer(args) => Some(&args.input),
        }
    }
}

/// A worker entry point: runs the worker's loop to completion.
pub type WorkerEntry = Arc<dyn Fn(WorkerArgs, StopFlag) -> Result<()> + Send + Sync>;

/// The (name, entry point, argument tuple) triple the supervisor uses
/// to launch and relaunch a worker.
#[derive(Clone)]
pub struct WorkerSpec {
    name: &'static str,
    entry: WorkerEntry,
    args: WorkerArgs,
}

impl WorkerSpec {
    pub fn new<F>(name: &'static str, args: WorkerArgs, entry: F) -> Self
    where
        F: Fn(WorkerArgs, StopFlag) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            entry: Arc::new(entry),
            args,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &WorkerArgs {
        &self.args
    }

    /// Launches the worker on a named thread with a fresh stop flag
    /// and a clone of the captured arguments.
    fn spawn(&self) -> Result<WorkerHandle> {
        let stop = StopFlag::new();
        let entry = self.entry.clone();
        let args = self.args.clone();
        let name = self.name;
        let worker_stop = stop.clone();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Err(e) = entry(args, worker_stop) {
                    tracing::error!(worker = name, "worker exited with error: {e}");
                }
            })
            .map_err(|e| PipelineError::WorkerSpawn {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(WorkerHandle {
            thread: Some(thread),
            stop,
        })
    }
}

/// Handle to one running worker instance.
pub struct WorkerHandle {
    thread: Option<JoinHandle<()>>,
    stop: StopFlag,
}

impl WorkerHandle {
    /// True while the worker's thread is still executing.
    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Joins a finished worker, logging a panic payload if there was one.
    fn reap(&mut self, name: &str) {
        if let Some(thread) = self.thread.take()
            && let Err(panic_info) = thread.join()
        {
            let msg = panic_info
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic");
            tracing::error!(worker = name, "worker thread panicked: {msg}");
        }
    }
}

/// Lifecycle state of a tracked worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Dead,
    Restarting,
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Dead => "dead",
            WorkerState::Restarting => "restarting",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

struct TrackedWorker {
    spec: WorkerSpec,
    handle: WorkerHandle,
    state: WorkerState,
    restarts: u32,
}

/// Keeps every pipeline worker alive until shutdown.
///
/// The polling loop here is the only component with an explicit
/// infinite cadence; everything else blocks on its queue. Restarts are
/// immediate, with no backoff and no cap, matching best-effort
/// keep-alive semantics: a persistently broken worker will restart-loop
/// and every restart is logged.
pub struct Supervisor {
    workers: Vec<TrackedWorker>,
    poll_interval: Duration,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            workers: Vec::new(),
            poll_interval,
        }
    }

    /// Launches a worker and tracks it under its unique name.
    pub fn spawn(&mut self, spec: WorkerSpec) -> Result<()> {
        if self.find(spec.name()).is_some() {
            return Err(PipelineError::WorkerSpawn {
                name: spec.name().to_string(),
                message: "a worker with this name is already tracked".to_string(),
            });
        }

        tracing::info!(worker = spec.name(), state = %WorkerState::Starting, "starting worker");
        let handle = spec.spawn()?;
        tracing::info!(worker = spec.name(), "started worker");

        self.workers.push(TrackedWorker {
            spec,
            handle,
            state: WorkerState::Running,
            restarts: 0,
        });
        Ok(())
    }

    /// One liveness sweep: restart every tracked worker whose execution
    /// unit died, reusing its original name and argument tuple.
    ///
    /// Returns the number of restarts issued.
    pub fn poll_once(&mut self) -> usize {
        let mut restarted = 0;
        for worker in &mut self.workers {
            if worker.state == WorkerState::Terminated || worker.handle.is_alive() {
                continue;
            }

            worker.state = WorkerState::Dead;
            tracing::error!(worker = worker.spec.name(), "worker died, restarting");
            worker.handle.reap(worker.spec.name());
            worker.state = WorkerState::Restarting;

            match worker.spec.spawn() {
                Ok(handle) => {
                    worker.handle = handle;
                    worker.state = WorkerState::Running;
                    worker.restarts += 1;
                    restarted += 1;
                    tracing::info!(worker = worker.spec.name(), "restarted worker");
                }
                Err(e) => {
                    // Thread spawn failing means the process is in bad
                    // shape; leave the worker dead and try again on the
                    // next sweep.
                    worker.state = WorkerState::Dead;
                    tracing::error!(worker = worker.spec.name(), "restart failed: {e}");
                }
            }
        }
        restarted
    }

    /// Polls liveness forever until `shutdown` is requested, then
    /// terminates every worker.
    pub fn run(&mut self, shutdown: StopFlag) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "supervisor running"
        );
        while !shutdown.is_requested() {
            self.poll_once();
            // Sleep in short slices so an interrupt is observed promptly.
            let deadline = Instant::now() + self.poll_interval;
            while Instant::now() < deadline {
                if shutdown.is_requested() {
                    break;
                }
                thread::sleep(SLEEP_SLICE.min(deadline - Instant::now()));
            }
        }
        self.terminate_all();
    }

    /// Terminates every tracked worker regardless of state: request the
    /// stop flag, close the primary input queue to wake a blocked pull,
    /// then join with a bounded wait and detach stragglers.
    pub fn terminate_all(&mut self) {
        for worker in &mut self.workers {
            worker.handle.stop.request();
            if let Some(queue) = worker.spec.args().primary_input() {
                queue.close();
            }
            worker.state = WorkerState::Terminated;
        }

        let deadline = Instant::now() + JOIN_DEADLINE;
        loop {
            let mut pending = 0;
            for worker in &mut self.workers {
                let finished = worker
                    .handle
                    .thread
                    .as_ref()
                    .is_some_and(|t| t.is_finished());
                if finished {
                    worker.handle.reap(worker.spec.name());
                } else if worker.handle.thread.is_some() {
                    pending += 1;
                }
            }

            if pending == 0 {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    pending,
                    "shutdown timeout, detaching remaining worker threads"
                );
                // Dropping the handles detaches the threads; they die
                // with the process.
                for worker in &mut self.workers {
                    worker.handle.thread = None;
                }
                break;
            }
            thread::sleep(SLEEP_SLICE);
        }
        tracing::info!("all workers terminated");
    }

    /// Current state of a worker, if tracked.
    pub fn worker_state(&self, name: &str) -> Option<WorkerState> {
        self.find(name).map(|w| w.state)
    }

    /// How many times a worker has been restarted.
    pub fn restart_count(&self, name: &str) -> Option<u32> {
        self.find(name).map(|w| w.restarts)
    }

    /// True while the named worker's execution unit is alive.
    pub fn is_alive(&self, name: &str) -> bool {
        self.find(name).is_some_and(|w| w.handle.is_alive())
    }

    fn find(&self, name: &str) -> Option<&TrackedWorker> {
        self.workers.iter().find(|w| w.spec.name() == name)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
