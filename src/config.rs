use crate::error::{PipelineError, Result};
use crate::refine::RefineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub transcriber: ListenerConfig,
    pub synthesizer: SynthesizerListenerConfig,
    pub refine: RefineConfig,
    pub supervisor: SupervisorConfig,
}

/// Bind address and port for a front-end listener
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 6006,
        }
    }
}

/// Listener settings for the synthesizer's streaming-audio socket.
///
/// Same shape as [`ListenerConfig`] but with its own default port, so
/// both sections can be omitted from the file entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesizerListenerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for SynthesizerListenerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8888,
        }
    }
}

impl From<SynthesizerListenerConfig> for ListenerConfig {
    fn from(value: SynthesizerListenerConfig) -> Self {
        Self {
            bind: value.bind,
            port: value.port,
        }
    }
}

/// Supervisor tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds between liveness sweeps.
    pub poll_interval_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl SupervisorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid
    /// TOML. Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|_| PipelineError::ConfigFileNotFound {
            path: path.display().to_string(),
        })?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}
