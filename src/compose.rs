//! B-text construction.
//!
//! Applies per-token write-mode decisions to rewrite the A-text into a
//! synthesis-ready string. Every token contributes exactly one build-log
//! entry: concatenating the original fragments reproduces the A-text and
//! concatenating the replacements reproduces the B-text, so the log proves
//! what the synthesizer actually spoke versus what was written.

use crate::annotate::{Annotation, WriteMode};
use crate::error::{Result, YomiageError};
use crate::text::chunk::{chunk_text, TextChunk};
use crate::text::kana::{hiragana_to_katakana, katakana_to_hiragana};
use crate::text::char_len;
use crate::tokenize::Token;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One character-span replacement performed while building the B-text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildLogEntry {
    /// Token index this entry was produced from.
    pub index: usize,
    pub original_fragment: String,
    pub replaced_fragment: String,
    /// Half-open character span of the original fragment in the A-text.
    pub char_start: usize,
    pub char_end: usize,
    pub write_mode: WriteMode,
}

/// Rewrite the A-text according to the annotations.
///
/// Tokens without an annotation keep their surface verbatim; annotated
/// tokens are rendered in the requested script from the asserted reading.
/// Silence pseudo-tokens pass through unchanged regardless of write mode.
pub fn build_b_text(
    a_text: &str,
    tokens: &[Token],
    annotations: &[Annotation],
) -> Result<(String, Vec<BuildLogEntry>)> {
    let mut by_index: HashMap<usize, &Annotation> = HashMap::new();
    for annotation in annotations {
        if annotation.index >= tokens.len() {
            return Err(YomiageError::Validation {
                field: "index".to_string(),
                message: format!(
                    "annotation references token {} but only {} tokens exist",
                    annotation.index,
                    tokens.len()
                ),
            });
        }
        by_index.insert(annotation.index, annotation);
    }

    let mut b_text = String::new();
    let mut log = Vec::with_capacity(tokens.len());
    let mut cursor = 0;

    for token in tokens {
        if token.char_start != cursor {
            return Err(YomiageError::Invariant {
                message: format!(
                    "token {} starts at {} but the previous token ended at {}",
                    token.index, token.char_start, cursor
                ),
            });
        }

        let (replaced, write_mode) = if token.is_silence() {
            (token.surface.clone(), WriteMode::Original)
        } else {
            match by_index.get(&token.index) {
                Some(annotation) => (render(token, annotation), annotation.write_mode),
                None => (token.surface.clone(), WriteMode::Original),
            }
        };

        b_text.push_str(&replaced);
        log.push(BuildLogEntry {
            index: token.index,
            original_fragment: token.surface.clone(),
            replaced_fragment: replaced,
            char_start: token.char_start,
            char_end: token.char_end,
            write_mode,
        });
        cursor = token.char_end;
    }

    if cursor != char_len(a_text) {
        return Err(YomiageError::Invariant {
            message: format!(
                "tokens cover {} characters but the text has {}",
                cursor,
                char_len(a_text)
            ),
        });
    }

    Ok((b_text, log))
}

/// Render one annotated token in its requested script.
fn render(token: &Token, annotation: &Annotation) -> String {
    let reading = if annotation.llm_reading_kana.is_empty() {
        token.reading_mecab.as_str()
    } else {
        annotation.llm_reading_kana.as_str()
    };
    match annotation.write_mode {
        WriteMode::Original => token.surface.clone(),
        _ if reading.is_empty() => token.surface.clone(),
        WriteMode::Hiragana => katakana_to_hiragana(reading),
        WriteMode::Katakana => hiragana_to_katakana(reading),
    }
}

/// Split B-text into synthesis chunks of at most `max_len` characters.
pub fn chunk_b_text(text: &str, max_len: usize) -> Vec<TextChunk> {
    chunk_text(text, max_len)
}
