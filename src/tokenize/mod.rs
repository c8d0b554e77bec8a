//! Morphological tokenization with character offsets.
//!
//! The analyzer's own output is offset-free, so offsets are reconstructed
//! here by walking the source text while consuming morphemes. Silence
//! directives are split off before analysis and re-inserted as pseudo-tokens
//! so the analyzer never tries to read the bracket characters as prose.

pub mod analyzer;

use crate::defaults::SILENCE_POS;
use crate::error::{Result, YomiageError};
use crate::text::preprocess::SILENCE_TAG_RE;
use serde::{Deserialize, Serialize};

pub use analyzer::JpreprocessAnalyzer;

/// One morphologically segmented unit of the source text.
///
/// Tokens are contiguous and offset-ordered: `char_end` of token *i* equals
/// `char_start` of token *i + 1*. Read-only after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub surface: String,
    /// Half-open character span in the preprocessed text.
    pub char_start: usize,
    pub char_end: usize,
    /// Dictionary-derived katakana reading; empty for non-lexical tokens.
    pub reading_mecab: String,
    /// Part-of-speech tag. Injected pause directives carry
    /// [`SILENCE_POS`](crate::defaults::SILENCE_POS) and no reading.
    pub pos: String,
}

impl Token {
    /// Whether this token is an injected pause directive.
    pub fn is_silence(&self) -> bool {
        self.pos == SILENCE_POS
    }

    /// Whether this token is a line-break gap.
    pub fn is_line_break(&self) -> bool {
        !self.surface.is_empty() && self.surface.chars().all(|c| matches!(c, '\n' | '\r'))
    }
}

/// One unit of raw analyzer output, before offsets are reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Morpheme {
    pub surface: String,
    pub pos: String,
    /// Katakana reading; empty when the analyzer has none.
    pub reading: String,
}

/// Seam over the morphological analysis library.
///
/// The production implementation wraps jpreprocess; tests substitute a
/// scripted fake so the suite does not depend on the bundled dictionary.
pub trait MorphAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>>;
}

/// Part-of-speech tag used for whitespace and other unanalyzed gap spans.
const GAP_POS: &str = "記号";

/// Tokenizer that augments analyzer output with character offsets and
/// silence pseudo-tokens.
pub struct Tokenizer<'a> {
    analyzer: &'a dyn MorphAnalyzer,
}

impl<'a> Tokenizer<'a> {
    pub fn new(analyzer: &'a dyn MorphAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Tokenize the preprocessed text into a contiguous, offset-ordered
    /// token sequence.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut char_cursor = 0;
        let mut byte_cursor = 0;

        for m in SILENCE_TAG_RE.find_iter(text) {
            let prose = &text[byte_cursor..m.start()];
            self.tokenize_prose(prose, &mut char_cursor, &mut tokens)?;

            let tag_chars = m.as_str().chars().count();
            tokens.push(Token {
                index: 0,
                surface: m.as_str().to_string(),
                char_start: char_cursor,
                char_end: char_cursor + tag_chars,
                reading_mecab: String::new(),
                pos: SILENCE_POS.to_string(),
            });
            char_cursor += tag_chars;
            byte_cursor = m.end();
        }

        let tail = &text[byte_cursor..];
        self.tokenize_prose(tail, &mut char_cursor, &mut tokens)?;

        for (index, token) in tokens.iter_mut().enumerate() {
            token.index = index;
        }
        Ok(tokens)
    }

    /// Tokenize one directive-free span, emitting whitespace runs as their
    /// own gap tokens so the sequence stays contiguous.
    fn tokenize_prose(
        &self,
        prose: &str,
        char_cursor: &mut usize,
        tokens: &mut Vec<Token>,
    ) -> Result<()> {
        for piece in split_keeping_separators(prose) {
            match piece {
                Piece::Whitespace(ws) => {
                    let len = ws.chars().count();
                    tokens.push(Token {
                        index: 0,
                        surface: ws.to_string(),
                        char_start: *char_cursor,
                        char_end: *char_cursor + len,
                        reading_mecab: String::new(),
                        pos: GAP_POS.to_string(),
                    });
                    *char_cursor += len;
                }
                Piece::Prose(run) => {
                    self.align_morphemes(run, char_cursor, tokens)?;
                }
            }
        }
        Ok(())
    }

    /// Run the analyzer over one prose run and map each morpheme back onto
    /// its source span. The analyzer occasionally normalizes surfaces; a
    /// morpheme that cannot be located in the run is an alignment failure.
    fn align_morphemes(
        &self,
        run: &str,
        char_cursor: &mut usize,
        tokens: &mut Vec<Token>,
    ) -> Result<()> {
        let morphemes = self.analyzer.analyze(run)?;
        let chars: Vec<char> = run.chars().collect();
        let mut pos = 0;

        for m in morphemes {
            let surface: Vec<char> = m.surface.chars().collect();
            if surface.is_empty() {
                continue;
            }

            // Some analyzers silently drop whitespace between morphemes.
            while pos < chars.len()
                && chars[pos].is_whitespace()
                && chars[pos] != surface[0]
            {
                tokens.push(Token {
                    index: 0,
                    surface: chars[pos].to_string(),
                    char_start: *char_cursor,
                    char_end: *char_cursor + 1,
                    reading_mecab: String::new(),
                    pos: GAP_POS.to_string(),
                });
                pos += 1;
                *char_cursor += 1;
            }

            if chars[pos..].starts_with(&surface) {
                tokens.push(Token {
                    index: 0,
                    surface: m.surface.clone(),
                    char_start: *char_cursor,
                    char_end: *char_cursor + surface.len(),
                    reading_mecab: m.reading,
                    pos: m.pos,
                });
                pos += surface.len();
                *char_cursor += surface.len();
            } else {
                return Err(YomiageError::TokenAlignment {
                    offset: *char_cursor,
                    surface: m.surface,
                });
            }
        }

        // Trailing characters the analyzer did not cover.
        if pos < chars.len() {
            let rest: String = chars[pos..].iter().collect();
            if !rest.chars().all(|c| c.is_whitespace()) {
                return Err(YomiageError::TokenAlignment {
                    offset: *char_cursor,
                    surface: rest,
                });
            }
            let len = rest.chars().count();
            tokens.push(Token {
                index: 0,
                surface: rest,
                char_start: *char_cursor,
                char_end: *char_cursor + len,
                reading_mecab: String::new(),
                pos: GAP_POS.to_string(),
            });
            *char_cursor += len;
        }

        Ok(())
    }
}

enum Piece<'a> {
    Prose(&'a str),
    Whitespace(&'a str),
}

/// Split text into alternating prose and newline/whitespace-run pieces.
/// Only line breaks are separated out here; inline spaces stay with their
/// prose run and are handled during alignment.
fn split_keeping_separators(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let bytes = text.char_indices().collect::<Vec<_>>();
    let mut i = 0;

    while i < bytes.len() {
        let (byte_idx, c) = bytes[i];
        if c == '\n' || c == '\r' {
            if byte_idx > start {
                pieces.push(Piece::Prose(&text[start..byte_idx]));
            }
            let ws_start = byte_idx;
            while i < bytes.len() && matches!(bytes[i].1, '\n' | '\r') {
                i += 1;
            }
            let ws_end = if i < bytes.len() { bytes[i].0 } else { text.len() };
            pieces.push(Piece::Whitespace(&text[ws_start..ws_end]));
            start = ws_end;
        } else {
            i += 1;
        }
    }
    if start < text.len() {
        pieces.push(Piece::Prose(&text[start..]));
    }
    pieces
}
