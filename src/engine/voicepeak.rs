//! VOICEPEAK CLI engine driver.
//!
//! VOICEPEAK has no HTTP API and no phonetic query; synthesis shells out to
//! its command-line interface and the reading stream falls back to the
//! dictionary concatenation upstream.

use crate::audio::measure_wav_bytes;
use crate::engine::{SpeechEngine, SynthesizedChunk};
use crate::error::{Result, YomiageError};
use std::process::Command;
use tracing::debug;

pub struct VoicepeakEngine {
    path: String,
    narrator: String,
}

impl VoicepeakEngine {
    pub fn new(path: &str, narrator: &str) -> Self {
        Self {
            path: path.to_string(),
            narrator: narrator.to_string(),
        }
    }
}

impl SpeechEngine for VoicepeakEngine {
    fn name(&self) -> &'static str {
        "voicepeak"
    }

    fn kana_reading(&self, _text: &str) -> Result<String> {
        Err(YomiageError::Engine {
            engine: "voicepeak".to_string(),
            message: "voicepeak does not expose a phonetic query".to_string(),
        })
    }

    fn synthesize(&self, text: &str) -> Result<SynthesizedChunk> {
        let out = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .map_err(YomiageError::Io)?;
        let out_path = out.path().to_path_buf();

        let status = Command::new(&self.path)
            .arg("-s")
            .arg(text)
            .arg("-n")
            .arg(&self.narrator)
            .arg("-o")
            .arg(&out_path)
            .status()
            .map_err(|e| YomiageError::Engine {
                engine: "voicepeak".to_string(),
                message: format!("failed to launch {}: {}", self.path, e),
            })?;

        if !status.success() {
            return Err(YomiageError::Engine {
                engine: "voicepeak".to_string(),
                message: format!("exited with status {}", status),
            });
        }

        let wav = std::fs::read(&out_path)?;
        let info = measure_wav_bytes(&wav)?;
        debug!(
            chars = text.chars().count(),
            duration_sec = info.duration_sec,
            "synthesized chunk"
        );
        Ok(SynthesizedChunk {
            wav,
            duration_sec: info.duration_sec,
            sample_rate: info.sample_rate,
        })
    }
}
