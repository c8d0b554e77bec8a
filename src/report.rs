//! Structured JSON audit log.
//!
//! The log carries enough provenance to reconstruct why any word was
//! pronounced the way it was without re-running the LLM: both raw
//! readings, every risk verdict, the full build log, and the measured
//! segment timings. Sibling convenience files (`a_text.txt`,
//! `b_text.txt`, `tokens.json`) land in the same directory.

use crate::annotate::Annotation;
use crate::compose::BuildLogEntry;
use crate::engine::SpeechEngine;
use crate::error::Result;
use crate::pipeline::{AudioSegment, PipelineJob};
use crate::reading::{EngineReading, ReadingSource};
use crate::srt::SrtEntry;
use crate::text::kana::normalize_kana;
use crate::text::preprocess::PreprocessMeta;
use crate::tokenize::Token;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct KanaEngineLog {
    raw: String,
    normalized: String,
    source: ReadingSource,
}

#[derive(Debug, Serialize)]
struct AudioLog {
    wav_path: String,
    sample_rate: u32,
    duration_sec: f64,
}

#[derive(Debug, Serialize)]
struct EngineMetadataLog {
    name: String,
    supports_kana_query: bool,
}

#[derive(Debug, Serialize)]
struct TtsLog<'a> {
    channel: &'a str,
    video_no: &'a str,
    script_id: &'a str,
    engine: &'a str,
    a_text: &'a str,
    b_text: &'a str,
    tokens: &'a [Token],
    kana_engine: KanaEngineLog,
    annotations: &'a [Annotation],
    b_text_build_log: &'a [BuildLogEntry],
    audio: AudioLog,
    engine_metadata: EngineMetadataLog,
    meta: &'a PreprocessMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    qa_issues: Option<Vec<String>>,
    srt_entries: &'a [SrtEntry],
    segments: &'a [AudioSegment],
}

/// Persist the audit log and its sibling artifacts; returns the log path.
#[allow(clippy::too_many_arguments)]
pub fn save_tts_log(
    out_dir: &Path,
    job: &PipelineJob,
    engine: &dyn SpeechEngine,
    a_text: &str,
    b_text: &str,
    tokens: &[Token],
    engine_reading: &EngineReading,
    annotations: &[Annotation],
    build_log: &[BuildLogEntry],
    meta: &PreprocessMeta,
    segments: &[AudioSegment],
    wav_path: &Path,
    sample_rate: u32,
    duration_sec: f64,
    srt_entries: &[SrtEntry],
) -> Result<PathBuf> {
    let qa_issues: Vec<String> = meta
        .control_chars
        .iter()
        .map(|w| {
            format!(
                "control_char U+{:04X} at character {}",
                w.code_point, w.char_index
            )
        })
        .collect();

    let log = TtsLog {
        channel: &job.channel,
        video_no: &job.video_no,
        script_id: &job.script_id,
        engine: engine.name(),
        a_text,
        b_text,
        tokens,
        kana_engine: KanaEngineLog {
            raw: engine_reading.raw.clone(),
            normalized: normalize_kana(&engine_reading.raw),
            source: engine_reading.source,
        },
        annotations,
        b_text_build_log: build_log,
        audio: AudioLog {
            wav_path: wav_path.display().to_string(),
            sample_rate,
            duration_sec,
        },
        engine_metadata: EngineMetadataLog {
            name: engine.name().to_string(),
            supports_kana_query: engine.supports_kana_query(),
        },
        meta,
        qa_issues: if qa_issues.is_empty() {
            None
        } else {
            Some(qa_issues)
        },
        srt_entries,
        segments,
    };

    let log_path = out_dir.join("tts_log.json");
    std::fs::write(&log_path, serde_json::to_vec_pretty(&log)?)?;
    std::fs::write(out_dir.join("a_text.txt"), a_text)?;
    std::fs::write(out_dir.join("b_text.txt"), b_text)?;
    std::fs::write(out_dir.join("tokens.json"), serde_json::to_vec_pretty(tokens)?)?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SynthesizedChunk;
    use crate::error::YomiageError;
    use crate::text::preprocess::preprocess;

    struct StubEngine;
    impl SpeechEngine for StubEngine {
        fn name(&self) -> &'static str {
            "voicevox"
        }
        fn supports_kana_query(&self) -> bool {
            true
        }
        fn kana_reading(&self, _text: &str) -> crate::error::Result<String> {
            Err(YomiageError::Other("stub".to_string()))
        }
        fn synthesize(&self, _text: &str) -> crate::error::Result<SynthesizedChunk> {
            Err(YomiageError::Other("stub".to_string()))
        }
    }

    #[test]
    fn log_and_sibling_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let job = PipelineJob {
            channel: "ch01".to_string(),
            video_no: "003".to_string(),
            script_id: "ch01-003".to_string(),
        };
        let (_, meta) = preprocess("今日\u{0007}は", false);
        let reading = EngineReading {
            raw: "キョ'ウワ".to_string(),
            source: ReadingSource::Engine,
            blocks: Vec::new(),
        };

        let log_path = save_tts_log(
            dir.path(),
            &job,
            &StubEngine,
            "今日は",
            "きょうは",
            &[],
            &reading,
            &[],
            &[],
            &meta,
            &[],
            &dir.path().join("audio.wav"),
            24000,
            12.5,
            &[],
        )
        .unwrap();

        let raw = std::fs::read_to_string(&log_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["channel"], "ch01");
        assert_eq!(value["engine"], "voicevox");
        assert_eq!(value["kana_engine"]["normalized"], "キョウワ");
        assert_eq!(value["audio"]["sample_rate"], 24000);
        // Control character from the meta surfaces as a QA issue.
        assert!(value["qa_issues"][0]
            .as_str()
            .unwrap()
            .contains("control_char"));

        assert_eq!(
            std::fs::read_to_string(dir.path().join("a_text.txt")).unwrap(),
            "今日は"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("b_text.txt")).unwrap(),
            "きょうは"
        );
        assert!(dir.path().join("tokens.json").exists());
    }

    #[test]
    fn qa_issues_field_is_omitted_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let job = PipelineJob {
            channel: "ch01".to_string(),
            video_no: "001".to_string(),
            script_id: "ch01-001".to_string(),
        };
        let (_, meta) = preprocess("きれいな原稿", false);
        let reading = EngineReading {
            raw: String::new(),
            source: ReadingSource::Dictionary,
            blocks: Vec::new(),
        };

        let log_path = save_tts_log(
            dir.path(),
            &job,
            &StubEngine,
            "きれいな原稿",
            "きれいな原稿",
            &[],
            &reading,
            &[],
            &[],
            &meta,
            &[],
            &dir.path().join("audio.wav"),
            24000,
            1.0,
            &[],
        )
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&log_path).unwrap()).unwrap();
        assert!(value.get("qa_issues").is_none());
    }
}
