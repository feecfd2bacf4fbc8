//! Error types for voxflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Missing required option: {option}")]
    MissingOption { option: String },

    #[error("Backend '{backend}' requires {option}")]
    BackendRequires { backend: String, option: String },

    #[error("Options --mistral and --phi are mutually exclusive")]
    ConflictingBackends,

    // TLS errors
    #[error("TLS certificate or key not found at {path}")]
    TlsMaterialNotFound { path: String },

    #[error("Failed to load TLS certificate: {message}")]
    TlsInvalid { message: String },

    // Worker lifecycle errors
    #[error("Failed to spawn worker '{name}': {message}")]
    WorkerSpawn { name: String, message: String },

    #[error("Worker '{name}' received arguments for a different stage")]
    WorkerArgsMismatch { name: String },

    #[error("Listener error: {message}")]
    Listener { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PipelineError>;
