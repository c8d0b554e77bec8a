//! Sequential synthesis pipeline.
//!
//! One invocation runs the full chain for one script: preprocess,
//! tokenize, dual reading, risk scoring, LLM adjudication, B-text
//! construction, segmentation, per-chunk synthesis, concatenation, and
//! SRT/log emission. Stages run strictly in order on the calling thread;
//! token and chunk order is preserved end to end. Per-chunk WAVs live in a
//! pipeline-owned temp directory that is removed on every exit path.

use crate::annotate::{Annotation, Annotator, WriteMode};
use crate::audio::{concat_wavs, ConcatPiece};
use crate::compose::{build_b_text, BuildLogEntry};
use crate::config::Config;
use crate::engine::SpeechEngine;
use crate::error::{Result, YomiageError};
use crate::reading::{build_kana_engine, dictionary_reading, EngineReading};
use crate::risk::{build_payload, score, RiskySpan};
use crate::srt::write_srt;
use crate::text::char_len;
use crate::text::preprocess::{preprocess, PreprocessMeta};
use crate::tokenize::{MorphAnalyzer, Token, Tokenizer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The resolved source of truth for one segment's pronunciation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbiterVerdict {
    /// Both readings agreed, no adjudication needed.
    Match,
    /// The dictionary reading stands.
    Mecab,
    /// The engine reading is what the listener hears.
    Voicevox,
    /// The LLM overrode both.
    LlmFixed,
}

/// The unit of timed audio assembled into the final track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// Display text (original script characters).
    pub text: String,
    /// Synthesis input actually spoken (B-text chunk).
    pub reading: String,
    pub pre_pause_sec: f64,
    pub post_pause_sec: f64,
    pub is_heading: bool,
    pub heading_level: u8,
    pub original_line_index: usize,
    /// Per-chunk temp WAV; deleted after final concatenation.
    pub wav_path: PathBuf,
    /// Measured length of the synthesized audio, never an estimate.
    pub duration_sec: f64,
    pub mecab_reading: String,
    pub voicevox_reading: String,
    pub arbiter_verdict: ArbiterVerdict,
}

/// Identity of one (channel, video) job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineJob {
    pub channel: String,
    pub video_no: String,
    pub script_id: String,
}

/// Terminal artifact bundle of one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub wav_path: PathBuf,
    pub srt_path: PathBuf,
    pub log_path: PathBuf,
    pub total_duration_sec: f64,
    pub sample_rate: u32,
    pub segments: Vec<AudioSegment>,
}

/// Run the full pipeline for one script.
///
/// Artifacts are written into `out_dir` only after the stage producing
/// them completes; a failure leaves no partial final outputs.
pub fn run(
    config: &Config,
    job: &PipelineJob,
    analyzer: &dyn MorphAnalyzer,
    engine: &dyn SpeechEngine,
    annotator: &dyn Annotator,
    a_text_raw: &str,
    out_dir: &Path,
) -> Result<PipelineResult> {
    info!(channel = %job.channel, video_no = %job.video_no, engine = engine.name(), "pipeline start");

    let (a_text, meta) = preprocess(a_text_raw, config.preprocess.strip_markdown);
    for w in &meta.control_chars {
        warn!(char_index = w.char_index, code_point = w.code_point, "control character in script");
    }
    if config.preprocess.fail_on_control_chars && !meta.control_chars.is_empty() {
        return Err(YomiageError::Validation {
            field: "a_text".to_string(),
            message: format!("{} control characters in script", meta.control_chars.len()),
        });
    }

    let tokens = Tokenizer::new(analyzer).tokenize(&a_text)?;
    info!(tokens = tokens.len(), "tokenized");

    let engine_reading =
        build_kana_engine(engine, &a_text, &tokens, config.chunking.kana_query_max_chars)?;

    let spans = score(&tokens, &engine_reading);
    info!(risky = spans.len(), "risk scoring complete");

    let payload = build_payload(&a_text, &tokens, &spans, &engine_reading, config.risk.max_examples);
    let annotations = if payload.is_empty() {
        Vec::new()
    } else {
        annotator.annotate(&payload)?
    };

    let (b_text, build_log) = build_b_text(&a_text, &tokens, &annotations)?;

    let plans = assemble_segments(
        &tokens,
        &build_log,
        &meta,
        &spans,
        &annotations,
        &engine_reading,
        config,
    )?;
    if plans.is_empty() {
        return Err(YomiageError::Validation {
            field: "a_text".to_string(),
            message: "script contains no synthesizable text".to_string(),
        });
    }

    std::fs::create_dir_all(out_dir)?;
    let scratch = tempfile::tempdir()?;
    let mut segments = Vec::with_capacity(plans.len());
    for (i, plan) in plans.into_iter().enumerate() {
        let chunk = engine.synthesize(&plan.reading)?;
        let wav_path = scratch.path().join(format!("segment_{:04}.wav", i));
        std::fs::write(&wav_path, &chunk.wav)?;
        segments.push(AudioSegment {
            text: plan.text,
            reading: plan.reading,
            pre_pause_sec: plan.pre_pause_sec,
            post_pause_sec: plan.post_pause_sec,
            is_heading: plan.is_heading,
            heading_level: plan.heading_level,
            original_line_index: plan.original_line_index,
            wav_path,
            duration_sec: chunk.duration_sec,
            mecab_reading: plan.mecab_reading,
            voicevox_reading: plan.voicevox_reading,
            arbiter_verdict: plan.arbiter_verdict,
        });
    }

    // No trailing pause after the last spoken segment.
    if let Some(last) = segments.last_mut() {
        last.post_pause_sec = 0.0;
    }

    let pieces: Vec<ConcatPiece> = segments
        .iter()
        .map(|s| ConcatPiece {
            wav_path: s.wav_path.clone(),
            silence_before_sec: s.pre_pause_sec,
            silence_after_sec: s.post_pause_sec,
        })
        .collect();
    let wav_path = out_dir.join("audio.wav");
    let concat = concat_wavs(&pieces, &wav_path)?;

    let arithmetic_total: f64 = segments
        .iter()
        .map(|s| s.pre_pause_sec + s.duration_sec + s.post_pause_sec)
        .sum();
    if (concat.total_duration_sec - arithmetic_total).abs() > 0.05 {
        return Err(YomiageError::Invariant {
            message: format!(
                "track duration {} disagrees with segment arithmetic {}",
                concat.total_duration_sec, arithmetic_total
            ),
        });
    }

    let srt_path = out_dir.join("subtitles.srt");
    let srt_entries = write_srt(&segments, &srt_path)?;

    let log_path = crate::report::save_tts_log(
        out_dir,
        job,
        engine,
        &a_text,
        &b_text,
        &tokens,
        &engine_reading,
        &annotations,
        &build_log,
        &meta,
        &segments,
        &wav_path,
        concat.sample_rate,
        concat.total_duration_sec,
        &srt_entries,
    )?;

    info!(
        duration_sec = concat.total_duration_sec,
        segments = segments.len(),
        "pipeline complete"
    );

    Ok(PipelineResult {
        wav_path,
        srt_path,
        log_path,
        total_duration_sec: concat.total_duration_sec,
        sample_rate: concat.sample_rate,
        segments,
    })
}

/// Plan for one not-yet-synthesized segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SegmentPlan {
    pub text: String,
    pub reading: String,
    pub pre_pause_sec: f64,
    pub post_pause_sec: f64,
    pub is_heading: bool,
    pub heading_level: u8,
    pub original_line_index: usize,
    pub mecab_reading: String,
    pub voicevox_reading: String,
    pub arbiter_verdict: ArbiterVerdict,
}

/// Walk the build log and cut the B-text into synthesis segments.
///
/// Lines keep their identity (heading pauses, line-end pauses); silence
/// directives flush the current run and turn into the next segment's
/// pre-pause; runs longer than the chunk budget split on sentence
/// boundaries between log entries, falling back to a cut at the budget.
pub(crate) fn assemble_segments(
    tokens: &[Token],
    build_log: &[BuildLogEntry],
    meta: &PreprocessMeta,
    spans: &[RiskySpan],
    annotations: &[Annotation],
    engine_reading: &EngineReading,
    config: &Config,
) -> Result<Vec<SegmentPlan>> {
    let heading_by_line: HashMap<usize, u8> = meta
        .headings
        .iter()
        .map(|h| (h.line_index, h.level))
        .collect();
    let silence_by_start: HashMap<usize, f64> = meta
        .silence_tags
        .iter()
        .map(|t| (t.char_start, t.seconds))
        .collect();

    let ctx = VerdictContext::new(spans, annotations);

    let mut plans: Vec<SegmentPlan> = Vec::new();
    let mut line_plans: Vec<SegmentPlan> = Vec::new();
    let mut part: Vec<&BuildLogEntry> = Vec::new();
    let mut line_index = 0usize;
    let mut pending_pre = 0.0f64;

    let flush_line = |line_plans: &mut Vec<SegmentPlan>,
                      plans: &mut Vec<SegmentPlan>,
                      line_index: usize| {
        if line_plans.is_empty() {
            return;
        }
        match heading_by_line.get(&line_index).copied() {
            Some(level) => {
                if let Some(first) = line_plans.first_mut() {
                    first.pre_pause_sec += config.pause.heading_pre_sec;
                }
                if let Some(last) = line_plans.last_mut() {
                    last.post_pause_sec += config.pause.heading_post_sec;
                }
                for plan in line_plans.iter_mut() {
                    plan.is_heading = true;
                    plan.heading_level = level;
                }
            }
            None => {
                if let Some(last) = line_plans.last_mut() {
                    last.post_pause_sec += config.pause.line_end_sec;
                }
            }
        }
        plans.append(line_plans);
    };

    for entry in build_log {
        let token = &tokens[entry.index];
        if token.is_line_break() {
            flush_part(
                &mut part,
                &mut line_plans,
                &mut pending_pre,
                line_index,
                tokens,
                engine_reading,
                &ctx,
                config,
            );
            flush_line(&mut line_plans, &mut plans, line_index);
            line_index += token.surface.chars().filter(|&c| c == '\n').count();
        } else if token.is_silence() {
            flush_part(
                &mut part,
                &mut line_plans,
                &mut pending_pre,
                line_index,
                tokens,
                engine_reading,
                &ctx,
                config,
            );
            let seconds = silence_by_start
                .get(&token.char_start)
                .copied()
                .unwrap_or_else(|| parse_silence_surface(&token.surface));
            pending_pre += seconds;
        } else {
            part.push(entry);
        }
    }
    flush_part(
        &mut part,
        &mut line_plans,
        &mut pending_pre,
        line_index,
        tokens,
        engine_reading,
        &ctx,
        config,
    );
    flush_line(&mut line_plans, &mut plans, line_index);

    // A trailing directive with nothing after it becomes a post-pause on
    // the final segment.
    if pending_pre > 0.0
        && let Some(last) = plans.last_mut()
    {
        last.post_pause_sec += pending_pre;
    }

    Ok(plans)
}

/// Chunk the accumulated log entries and append segment plans for them.
#[allow(clippy::too_many_arguments)]
fn flush_part(
    part: &mut Vec<&BuildLogEntry>,
    line_plans: &mut Vec<SegmentPlan>,
    pending_pre: &mut f64,
    line_index: usize,
    tokens: &[Token],
    engine_reading: &EngineReading,
    ctx: &VerdictContext,
    config: &Config,
) {
    if part.is_empty() {
        return;
    }
    let groups = chunk_entries(part, config.chunking.max_chunk_chars);
    part.clear();

    let group_count = groups.len();
    for (i, group) in groups.into_iter().enumerate() {
        let reading: String = group.iter().map(|e| e.replaced_fragment.as_str()).collect();
        if reading.trim().is_empty() {
            continue;
        }
        let text: String = group.iter().map(|e| e.original_fragment.as_str()).collect();
        let char_start = group.first().map(|e| e.char_start).unwrap_or(0);
        let char_end = group.last().map(|e| e.char_end).unwrap_or(0);

        let voicevox_reading = engine_reading
            .blocks
            .iter()
            .filter(|b| b.char_start < char_end && b.char_end > char_start)
            .map(|b| b.reading.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        line_plans.push(SegmentPlan {
            text: text.trim().to_string(),
            reading,
            pre_pause_sec: std::mem::take(pending_pre),
            post_pause_sec: if i + 1 < group_count {
                config.pause.inter_chunk_sec
            } else {
                0.0
            },
            is_heading: false,
            heading_level: 0,
            original_line_index: line_index,
            mecab_reading: dictionary_reading(tokens, char_start, char_end),
            voicevox_reading,
            arbiter_verdict: ctx.verdict(group.iter().map(|e| e.index)),
        });
    }
}

/// Split a run of log entries at sentence boundaries so each group's
/// replacement text stays within the chunk budget.
fn chunk_entries<'a>(
    entries: &[&'a BuildLogEntry],
    max_chars: usize,
) -> Vec<Vec<&'a BuildLogEntry>> {
    let mut groups = Vec::new();
    let mut current: Vec<&BuildLogEntry> = Vec::new();
    let mut current_len = 0usize;
    let mut last_boundary: Option<usize> = None;

    for &entry in entries {
        let len = char_len(&entry.replaced_fragment);
        if current_len + len > max_chars && !current.is_empty() {
            let cut = last_boundary.map(|b| b + 1).unwrap_or(current.len());
            let rest = current.split_off(cut);
            groups.push(std::mem::replace(&mut current, rest));
            current_len = current.iter().map(|e| char_len(&e.replaced_fragment)).sum();
            last_boundary = None;
        }
        current.push(entry);
        current_len += len;
        if entry
            .replaced_fragment
            .chars()
            .next_back()
            .is_some_and(|c| matches!(c, '。' | '！' | '？' | '!' | '?' | '.'))
        {
            last_boundary = Some(current.len() - 1);
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn parse_silence_surface(surface: &str) -> f64 {
    surface
        .trim_matches(['[', ']'])
        .trim_end_matches('s')
        .parse()
        .unwrap_or(0.0)
}

/// Lookup tables for deriving one segment's arbiter verdict.
struct VerdictContext {
    llm_fixed: HashSet<usize>,
    hazard: HashSet<usize>,
    block_diff: HashSet<usize>,
}

impl VerdictContext {
    fn new(spans: &[RiskySpan], annotations: &[Annotation]) -> Self {
        Self {
            llm_fixed: annotations
                .iter()
                .filter(|a| a.write_mode != WriteMode::Original)
                .map(|a| a.index)
                .collect(),
            hazard: spans
                .iter()
                .filter(|s| s.reason.starts_with("hazard:"))
                .map(|s| s.token_index)
                .collect(),
            block_diff: spans
                .iter()
                .filter(|s| s.reason == "block_diff")
                .map(|s| s.token_index)
                .collect(),
        }
    }

    /// LLM rewrites dominate; an unresolved engine disagreement means the
    /// engine's pronunciation is what plays; a hazard the LLM left alone
    /// resolves to the dictionary reading; otherwise the sources agreed.
    fn verdict(&self, token_indices: impl Iterator<Item = usize>) -> ArbiterVerdict {
        let mut saw_block_diff = false;
        let mut saw_hazard = false;
        for index in token_indices {
            if self.llm_fixed.contains(&index) {
                return ArbiterVerdict::LlmFixed;
            }
            saw_block_diff |= self.block_diff.contains(&index);
            saw_hazard |= self.hazard.contains(&index);
        }
        if saw_block_diff {
            ArbiterVerdict::Voicevox
        } else if saw_hazard {
            ArbiterVerdict::Mecab
        } else {
            ArbiterVerdict::Match
        }
    }
}
