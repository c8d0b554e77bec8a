//! SubRip subtitle emission.
//!
//! Walks the segment list with a running timestamp cursor: a segment's
//! displayed interval starts after its pre-pause and lasts exactly its
//! measured duration; the cursor then advances past the post-pause. Block
//! times are monotonic by construction, and an end time before its start
//! is a fatal invariant violation, never clamped.

use crate::error::{Result, YomiageError};
use crate::pipeline::AudioSegment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One rendered subtitle block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrtEntry {
    /// Sequential 1-based block index.
    pub index: usize,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// Compute subtitle blocks from the segment list.
pub fn build_entries(segments: &[AudioSegment]) -> Result<Vec<SrtEntry>> {
    let mut entries = Vec::with_capacity(segments.len());
    let mut cursor = 0.0f64;

    for segment in segments {
        if segment.pre_pause_sec < 0.0 || segment.post_pause_sec < 0.0 {
            return Err(YomiageError::Invariant {
                message: format!(
                    "segment {:?} has a negative pause",
                    segment.text
                ),
            });
        }

        let start = cursor + segment.pre_pause_sec;
        let end = start + segment.duration_sec;
        if end < start {
            return Err(YomiageError::Invariant {
                message: format!(
                    "subtitle block for {:?} ends at {} before it starts at {}",
                    segment.text, end, start
                ),
            });
        }

        if !segment.text.trim().is_empty() {
            entries.push(SrtEntry {
                index: entries.len() + 1,
                start_sec: start,
                end_sec: end,
                text: segment.text.clone(),
            });
        }
        cursor += segment.pre_pause_sec + segment.duration_sec + segment.post_pause_sec;
    }

    Ok(entries)
}

/// Render segments as a SubRip document.
pub fn generate_srt(segments: &[AudioSegment]) -> Result<String> {
    let entries = build_entries(segments)?;
    let mut out = String::new();
    for entry in &entries {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            entry.index,
            format_timestamp(entry.start_sec),
            format_timestamp(entry.end_sec),
            entry.text
        ));
    }
    Ok(out)
}

/// Render segments and write the SRT file.
pub fn write_srt(segments: &[AudioSegment], out_path: &Path) -> Result<Vec<SrtEntry>> {
    let document = generate_srt(segments)?;
    std::fs::write(out_path, document)?;
    build_entries(segments)
}

/// Render seconds as `HH:MM:SS,mmm`.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}
