//! Command-line interface for voxflow
//!
//! Provides argument parsing using clap derive macros. Validation of
//! option combinations (backend pairs, TLS material) happens in the
//! composition root so that missing configuration exits with status 1
//! rather than a usage error.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Streaming speech-to-speech pipeline orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "voxflow",
    version,
    about = "Streaming speech-to-speech pipeline orchestrator"
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the speech-recognition engine (required)
    #[arg(long, value_name = "PATH")]
    pub asr_engine: Option<PathBuf>,

    /// Generate with the Mistral backend
    #[arg(long)]
    pub mistral: bool,

    /// Mistral engine path
    #[arg(long, value_name = "PATH")]
    pub mistral_engine: Option<PathBuf>,

    /// Mistral tokenizer path
    #[arg(long, value_name = "PATH")]
    pub mistral_tokenizer: Option<PathBuf>,

    /// Generate with the Phi backend
    #[arg(long)]
    pub phi: bool,

    /// Phi engine path
    #[arg(long, value_name = "PATH")]
    pub phi_engine: Option<PathBuf>,

    /// Phi tokenizer path
    #[arg(long, value_name = "PATH")]
    pub phi_tokenizer: Option<PathBuf>,

    /// Serve the edge listeners over TLS
    #[arg(long)]
    pub tls: bool,

    /// Path to TLS certificate file
    #[arg(long, value_name = "PATH")]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS key file
    #[arg(long, value_name = "PATH")]
    pub tls_key: Option<PathBuf>,

    /// Liveness poll interval (default: 5s). Examples: 5s, 500ms, 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_poll_interval)]
    pub poll_interval: Option<Duration>,
}

/// Parse a poll interval string into a duration.
///
/// Supports any format accepted by `humantime` plus bare numbers,
/// which are read as seconds.
fn parse_poll_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}
