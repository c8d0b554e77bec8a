//! Error types for yomiage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum YomiageError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Tokenizer errors
    #[error("Morphological analyzer unavailable: {message}")]
    TokenizerUnavailable { message: String },

    #[error("Token alignment failed at offset {offset}: surface {surface:?} not found in source text")]
    TokenAlignment { offset: usize, surface: String },

    // Synthesis engine errors
    #[error("Engine {engine} request failed: {message}")]
    Engine { engine: String, message: String },

    #[error("Engine {engine} is not reachable at {endpoint}: {message}")]
    EngineUnreachable {
        engine: String,
        endpoint: String,
        message: String,
    },

    // LLM annotator errors
    #[error("LLM request failed: {message}")]
    Llm { message: String },

    // Validation errors (malformed LLM/QA payloads)
    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    // Audio errors
    #[error("Audio format mismatch: expected {expected}, got {actual}")]
    AudioFormatMismatch { expected: String, actual: String },

    #[error("Audio processing failed: {message}")]
    AudioProcessing { message: String },

    // Timing/offset arithmetic gone wrong. These indicate a bug, not a
    // recoverable runtime condition.
    #[error("Invariant violation: {message}")]
    Invariant { message: String },

    // Transport and serialization
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, YomiageError>;
