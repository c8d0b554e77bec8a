//! VOICEVOX Engine HTTP client.
//!
//! Talks to a locally running VOICEVOX Engine: `/audio_query` produces a
//! synthesis query whose `kana` field is the engine's own reading of the
//! text, and `/synthesis` renders that query to WAV. The query JSON is
//! passed back to `/synthesis` unchanged.

use crate::audio::measure_wav_bytes;
use crate::defaults::{KANA_QUERY_TIMEOUT_SECS, SYNTHESIS_TIMEOUT_SECS};
use crate::engine::{SpeechEngine, SynthesizedChunk};
use crate::error::{Result, YomiageError};
use std::time::Duration;
use tracing::debug;

pub struct VoicevoxEngine {
    client: reqwest::blocking::Client,
    base_url: String,
    speaker_id: u32,
}

impl VoicevoxEngine {
    pub fn new(base_url: &str, speaker_id: u32) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(YomiageError::Http)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            speaker_id,
        })
    }

    pub fn speaker_id(&self) -> u32 {
        self.speaker_id
    }

    /// Engine version, used by the `check` command for reachability.
    pub fn version(&self) -> Result<String> {
        let url = format!("{}/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(KANA_QUERY_TIMEOUT_SECS))
            .send()
            .map_err(|e| YomiageError::EngineUnreachable {
                engine: "voicevox".to_string(),
                endpoint: url.clone(),
                message: e.to_string(),
            })?;
        Ok(response.text()?.trim_matches('"').to_string())
    }

    /// POST /audio_query and return the full query JSON.
    fn audio_query(&self, text: &str) -> Result<serde_json::Value> {
        let url = format!("{}/audio_query", self.base_url);
        let speaker = self.speaker_id.to_string();
        let response = self
            .client
            .post(&url)
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .timeout(Duration::from_secs(KANA_QUERY_TIMEOUT_SECS))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(YomiageError::Engine {
                engine: "voicevox".to_string(),
                message: format!("audio_query returned {}: {}", status, body),
            });
        }
        Ok(response.json()?)
    }
}

impl SpeechEngine for VoicevoxEngine {
    fn name(&self) -> &'static str {
        "voicevox"
    }

    fn supports_kana_query(&self) -> bool {
        true
    }

    fn kana_reading(&self, text: &str) -> Result<String> {
        let query = self.audio_query(text)?;
        extract_kana(&query)
    }

    fn synthesize(&self, text: &str) -> Result<SynthesizedChunk> {
        let query = self.audio_query(text)?;

        let url = format!("{}/synthesis", self.base_url);
        let speaker = self.speaker_id.to_string();
        let response = self
            .client
            .post(&url)
            .query(&[("speaker", speaker.as_str())])
            .json(&query)
            .timeout(Duration::from_secs(SYNTHESIS_TIMEOUT_SECS))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(YomiageError::Engine {
                engine: "voicevox".to_string(),
                message: format!("synthesis returned {}: {}", status, body),
            });
        }

        let wav = response.bytes()?.to_vec();
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

/// Pull the engine's kana reading out of an audio query.
fn extract_kana(query: &serde_json::Value) -> Result<String> {
    query
        .get("kana")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| YomiageError::Engine {
            engine: "voicevox".to_string(),
            message: "audio_query response has no kana field".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_kana_from_query_json() {
        let query: serde_json::Value = serde_json::from_str(
            r#"{
                "accent_phrases": [],
                "speedScale": 1.0,
                "outputSamplingRate": 24000,
                "outputStereo": false,
                "kana": "キョ'ーワ/イ'ーテ'ンキ"
            }"#,
        )
        .unwrap();
        assert_eq!(extract_kana(&query).unwrap(), "キョ'ーワ/イ'ーテ'ンキ");
    }

    #[test]
    fn extract_kana_missing_field_is_an_engine_error() {
        let query: serde_json::Value = serde_json::from_str(r#"{"accent_phrases": []}"#).unwrap();
        match extract_kana(&query) {
            Err(YomiageError::Engine { engine, message }) => {
                assert_eq!(engine, "voicevox");
                assert!(message.contains("kana"));
            }
            other => panic!("Expected Engine error, got {:?}", other),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let engine = VoicevoxEngine::new("http://localhost:50021/", 3).unwrap();
        assert_eq!(engine.base_url, "http://localhost:50021");
        assert_eq!(engine.speaker_id(), 3);
    }
}
