//! yomiage - Japanese narration synthesis with pronunciation arbitration
//!
//! Turns a UTF-8 script into narrated audio with timed subtitles. Ambiguous
//! kanji pronunciations are resolved by comparing the dictionary reading
//! against the synthesis engine's own reading and escalating real
//! disagreements to an LLM; every decision is preserved in a JSON audit log.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod annotate;
pub mod app;
pub mod audio;
pub mod cli;
pub mod compose;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod reading;
pub mod report;
pub mod risk;
pub mod srt;
pub mod text;
pub mod tokenize;

// Pipeline
pub use pipeline::{run, ArbiterVerdict, AudioSegment, PipelineJob, PipelineResult};

// Stage seams (production impls and the traits tests fake)
pub use annotate::{Annotation, Annotator, LlmAnnotator, WriteMode};
pub use engine::{SpeechEngine, SynthesizedChunk};
pub use tokenize::{JpreprocessAnalyzer, MorphAnalyzer, Token, Tokenizer};

// Error handling
pub use error::{Result, YomiageError};

// Config
pub use config::{Config, EngineKind};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
