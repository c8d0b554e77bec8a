//! Composition root: wires config, analyzer, engine and annotator together
//! for the CLI commands.

use crate::annotate::LlmAnnotator;
use crate::config::{Config, EngineKind};
use crate::engine::{create_engine, VoicepeakEngine, VoicevoxEngine};
use crate::pipeline::{run, PipelineJob, PipelineResult};
use crate::reading::build_kana_engine;
use crate::risk::score;
use crate::tokenize::{JpreprocessAnalyzer, Tokenizer};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::error;

/// Run the full pipeline for one script file.
pub fn run_synth(
    config: &Config,
    channel: &str,
    video_no: &str,
    input: &Path,
    out_dir: &Path,
    engine_override: Option<EngineKind>,
) -> Result<PipelineResult> {
    let kind = engine_override.unwrap_or_else(|| config.routing.resolve(channel, video_no));
    let analyzer = JpreprocessAnalyzer::new()?;
    let engine = create_engine(kind, config)?;
    let annotator = LlmAnnotator::new(&config.llm)?;

    let a_text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read script {}", input.display()))?;
    let job = PipelineJob {
        channel: channel.to_string(),
        video_no: video_no.to_string(),
        script_id: format!("{}-{}", channel, video_no),
    };

    let result = run(
        config,
        &job,
        &analyzer,
        engine.as_ref(),
        &annotator,
        &a_text,
        out_dir,
    )?;
    Ok(result)
}

/// One line of a batch jobs file: `channel,video_no,script_path,out_dir`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub channel: String,
    pub video_no: String,
    pub script_path: String,
    pub out_dir: String,
}

/// Parse a jobs file. Blank lines and `#` comments are skipped.
pub fn parse_jobs_file(contents: &str) -> Result<Vec<BatchJob>> {
    let mut jobs = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields.len() != 4 {
            anyhow::bail!(
                "jobs file line {}: expected 4 comma-separated fields, got {}",
                line_no + 1,
                fields.len()
            );
        }
        jobs.push(BatchJob {
            channel: fields[0].to_string(),
            video_no: fields[1].to_string(),
            script_path: fields[2].to_string(),
            out_dir: fields[3].to_string(),
        });
    }
    Ok(jobs)
}

/// Run the pipeline once per job, sequentially, with per-job failure
/// isolation: one job's failure is logged and the batch continues.
/// Returns (succeeded, failed) counts.
pub fn run_batch(config: &Config, jobs_path: &Path) -> Result<(usize, usize)> {
    let contents = std::fs::read_to_string(jobs_path)
        .with_context(|| format!("failed to read jobs file {}", jobs_path.display()))?;
    let jobs = parse_jobs_file(&contents)?;

    let mut succeeded = 0;
    let mut failed = 0;
    for job in &jobs {
        match run_synth(
            config,
            &job.channel,
            &job.video_no,
            Path::new(&job.script_path),
            Path::new(&job.out_dir),
            None,
        ) {
            Ok(result) => {
                succeeded += 1;
                println!(
                    "{}/{}: {} ({:.1}s)",
                    job.channel,
                    job.video_no,
                    result.wav_path.display(),
                    result.total_duration_sec
                );
            }
            Err(e) => {
                failed += 1;
                error!(channel = %job.channel, video_no = %job.video_no, error = %e, "job failed");
                eprintln!("{}/{}: FAILED: {:#}", job.channel, job.video_no, e);
            }
        }
    }
    Ok((succeeded, failed))
}

/// Run stages up to risk scoring and print the token/risk tables.
pub fn run_preview(
    config: &Config,
    channel: &str,
    video_no: &str,
    input: &Path,
) -> Result<()> {
    let kind = config.routing.resolve(channel, video_no);
    let analyzer = JpreprocessAnalyzer::new()?;
    let engine = create_engine(kind, config)?;

    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read script {}", input.display()))?;
    let (a_text, _meta) = crate::text::preprocess::preprocess(&raw, config.preprocess.strip_markdown);
    let tokens = Tokenizer::new(&analyzer).tokenize(&a_text)?;
    let reading = build_kana_engine(
        engine.as_ref(),
        &a_text,
        &tokens,
        config.chunking.kana_query_max_chars,
    )?;
    let spans = score(&tokens, &reading);

    println!("tokens ({}):", tokens.len());
    for token in &tokens {
        println!(
            "  [{:>4}] {:<12} {:<12} {} ({}..{})",
            token.index,
            token.surface,
            token.reading_mecab,
            token.pos,
            token.char_start,
            token.char_end
        );
    }
    println!("\nrisky spans ({}):", spans.len());
    for span in &spans {
        println!(
            "  [{:>4}] {:<12} score={:.2} {}",
            span.token_index, span.surface, span.risk_score, span.reason
        );
    }
    Ok(())
}

/// Verify the analyzer dictionary and the configured engines.
pub fn run_check(config: &Config) -> Result<()> {
    match JpreprocessAnalyzer::new() {
        Ok(_) => println!("analyzer: ok (bundled NAIST-jdic)"),
        Err(e) => println!("analyzer: UNAVAILABLE ({})", e),
    }

    let speaker = config.resolve_speaker_id();
    match &speaker {
        Ok(id) => println!("speaker id: {}", id),
        Err(e) => println!("speaker id: NOT CONFIGURED ({})", e),
    }

    match speaker
        .ok()
        .map(|id| VoicevoxEngine::new(&config.engine.base_url, id))
    {
        Some(Ok(engine)) => match engine.version() {
            Ok(version) => println!("voicevox: ok ({} at {})", version, config.engine.base_url),
            Err(e) => println!("voicevox: UNREACHABLE ({})", e),
        },
        _ => println!("voicevox: skipped (no speaker id)"),
    }

    let voicepeak = VoicepeakEngine::new(
        &config.engine.voicepeak_path,
        &config.engine.voicepeak_narrator,
    );
    let found = which_exists(&config.engine.voicepeak_path);
    println!(
        "{}: {}",
        voicepeak.name(),
        if found { "ok (binary found)" } else { "not found" }
    );

    if config.llm.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        println!("llm: api key configured ({})", config.llm.model);
    } else {
        println!("llm: NO API KEY");
    }
    Ok(())
}

fn which_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return Path::new(binary).exists();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_file_parses_fields_and_skips_comments() {
        let contents = "\
# channel, video, script, out
ch01, 001, scripts/ch01/001.txt, out/ch01/001

ch02,002,scripts/ch02/002.txt,out/ch02/002
";
        let jobs = parse_jobs_file(contents).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].channel, "ch01");
        assert_eq!(jobs[0].video_no, "001");
        assert_eq!(jobs[1].script_path, "scripts/ch02/002.txt");
    }

    #[test]
    fn jobs_file_with_wrong_field_count_is_rejected() {
        let result = parse_jobs_file("ch01,001,missing_out_dir.txt");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("line 1"));
    }

    #[test]
    fn which_exists_finds_absolute_paths_only_when_present() {
        assert!(!which_exists("/nonexistent/binary/path"));
    }
}
