//! Pipeline configuration.
//!
//! The configuration is an explicit struct constructed once per invocation
//! and passed as a parameter through every stage. Stages never read ambient
//! process state; environment overrides are applied here, up front.

use crate::defaults;
use crate::error::{Result, YomiageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub llm: LlmConfig,
    pub pause: PauseConfig,
    pub risk: RiskConfig,
    pub preprocess: PreprocessConfig,
    pub chunking: ChunkingConfig,
    pub routing: RoutingConfig,
}

/// Synthesis engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// VOICEVOX Engine base URL.
    pub base_url: String,
    /// Speaker/style ID from the environment. Populated by
    /// `with_env_overrides`, never read inside pipeline stages.
    pub speaker_id: Option<u32>,
    /// Numeric fallback speaker ID used when the environment variable is
    /// unset. When both are absent, speaker resolution is a hard error.
    pub fallback_speaker_id: Option<u32>,
    /// Path to the VOICEPEAK executable (CLI-driven engine).
    pub voicepeak_path: String,
    /// Narrator name passed to the VOICEPEAK CLI.
    pub voicepeak_narrator: String,
}

/// LLM adjudication configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// API key. Populated from the environment by `with_env_overrides`.
    pub api_key: Option<String>,
}

/// Inter-segment pause configuration, in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PauseConfig {
    pub inter_chunk_sec: f64,
    pub line_end_sec: f64,
    pub heading_pre_sec: f64,
    pub heading_post_sec: f64,
}

/// Risk scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Cap on example sentences attached per surface form in a
    /// vocabulary-level LLM request.
    pub max_examples: usize,
}

/// Preprocessor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Remove lightweight markup (heading hashes, bullets, emphasis).
    pub strip_markdown: bool,
    /// Abort when C0/C1 control characters are found instead of warning.
    pub fail_on_control_chars: bool,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per synthesis chunk.
    pub max_chunk_chars: usize,
    /// Maximum characters per engine kana query.
    pub kana_query_max_chars: usize,
}

/// Which synthesis engine a job routes to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Voicevox,
    Voicepeak,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Voicevox => "voicevox",
            EngineKind::Voicepeak => "voicepeak",
        }
    }
}

/// Engine routing table: script-level override > channel-level override >
/// global default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RoutingConfig {
    pub default_engine: EngineKind,
    /// Per-channel engine overrides, keyed by channel ID.
    pub channels: HashMap<String, EngineKind>,
    /// Per-script overrides, keyed by "<channel>/<video_no>".
    pub scripts: HashMap<String, EngineKind>,
}

impl RoutingConfig {
    /// Resolve the engine for one (channel, video) job.
    pub fn resolve(&self, channel: &str, video_no: &str) -> EngineKind {
        let script_key = format!("{}/{}", channel, video_no);
        if let Some(kind) = self.scripts.get(&script_key) {
            return *kind;
        }
        if let Some(kind) = self.channels.get(channel) {
            return *kind;
        }
        self.default_engine
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::VOICEVOX_BASE_URL.to_string(),
            speaker_id: None,
            fallback_speaker_id: None,
            voicepeak_path: "voicepeak".to_string(),
            voicepeak_narrator: "Japanese Female 1".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LLM_BASE_URL.to_string(),
            model: defaults::LLM_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            inter_chunk_sec: defaults::INTER_CHUNK_PAUSE_SEC,
            line_end_sec: defaults::LINE_END_PAUSE_SEC,
            heading_pre_sec: defaults::HEADING_PRE_PAUSE_SEC,
            heading_post_sec: defaults::HEADING_POST_PAUSE_SEC,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_examples: defaults::MAX_EXAMPLES_PER_SURFACE,
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_markdown: true,
            fail_on_control_chars: false,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: defaults::SYNTH_CHUNK_MAX_CHARS,
            kana_query_max_chars: defaults::KANA_QUERY_MAX_CHARS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file does not exist or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                YomiageError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                YomiageError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file is
    /// missing. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(YomiageError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - YOMIAGE_SPEAKER_ID → engine.speaker_id
    /// - YOMIAGE_ENGINE_URL → engine.base_url
    /// - OPENAI_API_KEY → llm.api_key
    /// - YOMIAGE_LLM_MODEL → llm.model
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(defaults::SPEAKER_ID_ENV)
            && let Ok(id) = raw.trim().parse::<u32>()
        {
            self.engine.speaker_id = Some(id);
        }

        if let Ok(url) = std::env::var("YOMIAGE_ENGINE_URL")
            && !url.is_empty()
        {
            self.engine.base_url = url;
        }

        if let Ok(key) = std::env::var(defaults::LLM_API_KEY_ENV)
            && !key.is_empty()
        {
            self.llm.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("YOMIAGE_LLM_MODEL")
            && !model.is_empty()
        {
            self.llm.model = model;
        }

        self
    }

    /// Resolve the speaker/style ID for VOICEVOX synthesis.
    ///
    /// The environment-provided ID wins; an explicitly configured numeric
    /// fallback is accepted next. Neither being set is a hard configuration
    /// error raised before any network call.
    pub fn resolve_speaker_id(&self) -> Result<u32> {
        if let Some(id) = self.engine.speaker_id {
            return Ok(id);
        }
        if let Some(id) = self.engine.fallback_speaker_id {
            return Ok(id);
        }
        Err(YomiageError::ConfigInvalidValue {
            key: "engine.speaker_id".to_string(),
            message: format!(
                "set {} or configure engine.fallback_speaker_id",
                defaults::SPEAKER_ID_ENV
            ),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/yomiage/yomiage.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("yomiage")
            .join("yomiage.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.engine.base_url, defaults::VOICEVOX_BASE_URL);
        assert_eq!(config.llm.model, defaults::LLM_MODEL);
        assert_eq!(config.risk.max_examples, defaults::MAX_EXAMPLES_PER_SURFACE);
        assert!(config.preprocess.strip_markdown);
        assert!(!config.preprocess.fail_on_control_chars);
        assert_eq!(config.routing.default_engine, EngineKind::Voicevox);
    }

    #[test]
    fn load_parses_partial_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[engine]\nbase_url = \"http://localhost:50022\"\nfallback_speaker_id = 3\n\n[chunking]\nmax_chunk_chars = 90\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.engine.base_url, "http://localhost:50022");
        assert_eq!(config.engine.fallback_speaker_id, Some(3));
        assert_eq!(config.chunking.max_chunk_chars, 90);
        // Untouched sections fall back to defaults
        assert_eq!(config.llm.base_url, defaults::LLM_BASE_URL);
    }

    #[test]
    fn load_missing_file_is_config_file_not_found() {
        let result = Config::load(Path::new("/nonexistent/yomiage.toml"));
        match result {
            Err(YomiageError::ConfigFileNotFound { path }) => {
                assert!(path.contains("yomiage.toml"));
            }
            other => panic!("Expected ConfigFileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn load_or_default_returns_defaults_for_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/yomiage.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_or_default_propagates_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine = not valid toml").unwrap();
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn resolve_speaker_id_prefers_env_value() {
        let mut config = Config::default();
        config.engine.speaker_id = Some(8);
        config.engine.fallback_speaker_id = Some(1);
        assert_eq!(config.resolve_speaker_id().unwrap(), 8);
    }

    #[test]
    fn resolve_speaker_id_uses_configured_fallback() {
        let mut config = Config::default();
        config.engine.fallback_speaker_id = Some(1);
        assert_eq!(config.resolve_speaker_id().unwrap(), 1);
    }

    #[test]
    fn resolve_speaker_id_without_any_source_is_an_error() {
        let config = Config::default();
        let err = config.resolve_speaker_id().unwrap_err();
        match err {
            YomiageError::ConfigInvalidValue { key, .. } => {
                assert_eq!(key, "engine.speaker_id");
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn routing_script_override_wins_over_channel() {
        let mut routing = RoutingConfig::default();
        routing
            .channels
            .insert("ch01".to_string(), EngineKind::Voicepeak);
        routing
            .scripts
            .insert("ch01/005".to_string(), EngineKind::Voicevox);

        assert_eq!(routing.resolve("ch01", "005"), EngineKind::Voicevox);
        assert_eq!(routing.resolve("ch01", "006"), EngineKind::Voicepeak);
        assert_eq!(routing.resolve("ch02", "001"), EngineKind::Voicevox);
    }

    #[test]
    fn engine_kind_round_trips_through_toml() {
        let routing: RoutingConfig =
            toml::from_str("default_engine = \"voicepeak\"").unwrap();
        assert_eq!(routing.default_engine, EngineKind::Voicepeak);
    }
}
