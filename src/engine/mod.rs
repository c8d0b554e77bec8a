//! Synthesis engine abstraction.
//!
//! Engines form a closed set (`EngineKind`) behind a common capability
//! trait: every engine can synthesize a chunk of text, and engines that
//! expose a phonetic query can also report their own kana reading. The
//! concrete engine is selected once, via the routing lookup, and threaded
//! through the pipeline — call sites never branch on engine names.

pub mod voicepeak;
pub mod voicevox;

use crate::config::{Config, EngineKind};
use crate::error::Result;

pub use voicepeak::VoicepeakEngine;
pub use voicevox::VoicevoxEngine;

/// One synthesized chunk of audio.
///
/// `duration_sec` is always measured from the WAV frame count, never
/// estimated from text length.
#[derive(Debug, Clone)]
pub struct SynthesizedChunk {
    pub wav: Vec<u8>,
    pub duration_sec: f64,
    pub sample_rate: u32,
}

/// Capability interface over a narration engine.
pub trait SpeechEngine {
    fn name(&self) -> &'static str;

    /// Whether this engine can report its own kana reading for a text.
    fn supports_kana_query(&self) -> bool {
        false
    }

    /// The engine's own kana reading of `text`.
    ///
    /// Only meaningful when `supports_kana_query` returns true; engines
    /// without a phonetic query return an error.
    fn kana_reading(&self, text: &str) -> Result<String>;

    /// Synthesize one chunk and measure its duration.
    fn synthesize(&self, text: &str) -> Result<SynthesizedChunk>;
}

/// Construct the engine selected by the routing lookup.
pub fn create_engine(kind: EngineKind, config: &Config) -> Result<Box<dyn SpeechEngine>> {
    match kind {
        EngineKind::Voicevox => {
            let speaker_id = config.resolve_speaker_id()?;
            Ok(Box::new(VoicevoxEngine::new(
                &config.engine.base_url,
                speaker_id,
            )?))
        }
        EngineKind::Voicepeak => Ok(Box::new(VoicepeakEngine::new(
            &config.engine.voicepeak_path,
            &config.engine.voicepeak_narrator,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YomiageError;

    #[test]
    fn create_voicevox_without_speaker_source_fails_fast() {
        let config = Config::default();
        let result = create_engine(EngineKind::Voicevox, &config);
        match result {
            Err(YomiageError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "engine.speaker_id");
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn create_voicevox_with_fallback_speaker_succeeds() {
        let mut config = Config::default();
        config.engine.fallback_speaker_id = Some(1);
        let engine = create_engine(EngineKind::Voicevox, &config).unwrap();
        assert_eq!(engine.name(), "voicevox");
        assert!(engine.supports_kana_query());
    }

    #[test]
    fn create_voicepeak_needs_no_speaker_id() {
        let config = Config::default();
        let engine = create_engine(EngineKind::Voicepeak, &config).unwrap();
        assert_eq!(engine.name(), "voicepeak");
        assert!(!engine.supports_kana_query());
    }
}
