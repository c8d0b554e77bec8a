//! Script preprocessing.
//!
//! Pure text transform over the raw A-text: BOM/whitespace stripping,
//! optional markdown removal, short-quotation collapsing, and detection of
//! control characters and inline silence directives. Nothing here performs
//! I/O, and control characters are recorded but never removed — the caller
//! decides whether to fail or proceed.

use crate::defaults::SHORT_QUOTE_MAX_CHARS;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Inline silence directive: `[3]` or `[1.5s]`.
    pub static ref SILENCE_TAG_RE: Regex =
        Regex::new(r"\[([0-9]+(?:\.[0-9]+)?)s?\]").expect("silence tag pattern");
    static ref HEADING_RE: Regex = Regex::new(r"^(#{1,6})\s*").expect("heading pattern");
    static ref BULLET_RE: Regex = Regex::new(r"^[-*+]\s+").expect("bullet pattern");
    static ref CORNER_QUOTE_RE: Regex =
        Regex::new("「([^「」]+)」").expect("corner quote pattern");
    static ref DOUBLE_QUOTE_RE: Regex =
        Regex::new("『([^『』]+)』").expect("double quote pattern");
}

/// One detected inline silence directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceTag {
    /// The directive text exactly as it appears, e.g. `[1.5s]`.
    pub text: String,
    /// Pause duration in seconds.
    pub seconds: f64,
    /// Half-open character span in the cleaned text.
    pub char_start: usize,
    pub char_end: usize,
}

/// One control character found in the cleaned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCharWarning {
    pub char_index: usize,
    pub code_point: u32,
}

/// One heading line detected during preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingLine {
    /// Zero-based line index into the cleaned text.
    pub line_index: usize,
    pub level: u8,
}

/// Everything the preprocessor learned about the script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessMeta {
    pub silence_tags: Vec<SilenceTag>,
    pub control_chars: Vec<ControlCharWarning>,
    pub headings: Vec<HeadingLine>,
}

/// Clean a raw script and report what was found.
///
/// Strips a leading byte-order mark and outer whitespace. With
/// `strip_markdown`, heading hashes, list bullets and emphasis/code
/// delimiters are removed (heading levels are still recorded either way).
/// Bracketed quotations of at most six characters with no internal
/// punctuation lose their bracket characters, so short quoted words do not
/// synthesize with an unnatural pause.
pub fn preprocess(raw: &str, strip_markdown: bool) -> (String, PreprocessMeta) {
    let mut meta = PreprocessMeta::default();

    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw).trim();

    let mut lines = Vec::new();
    for (line_index, line) in text.lines().enumerate() {
        let mut line = line.to_string();

        if let Some(caps) = HEADING_RE.captures(&line) {
            let level = caps[1].chars().count() as u8;
            meta.headings.push(HeadingLine { line_index, level });
            if strip_markdown {
                line = HEADING_RE.replace(&line, "").into_owned();
            }
        }

        if strip_markdown {
            line = BULLET_RE.replace(&line, "").into_owned();
            line = line.replace("**", "").replace('`', "");
        }

        lines.push(line);
    }
    let mut cleaned = lines.join("\n");

    cleaned = collapse_short_quotes(&cleaned, &CORNER_QUOTE_RE);
    cleaned = collapse_short_quotes(&cleaned, &DOUBLE_QUOTE_RE);

    for (char_index, c) in cleaned.chars().enumerate() {
        if c.is_control() && !matches!(c, '\t' | '\n' | '\r') {
            meta.control_chars.push(ControlCharWarning {
                char_index,
                code_point: c as u32,
            });
        }
    }

    for m in SILENCE_TAG_RE.captures_iter(&cleaned) {
        let whole = m.get(0).expect("match group 0 always present");
        let seconds: f64 = m[1].parse().unwrap_or(0.0);
        let char_start = cleaned[..whole.start()].chars().count();
        let char_end = char_start + whole.as_str().chars().count();
        meta.silence_tags.push(SilenceTag {
            text: whole.as_str().to_string(),
            seconds,
            char_start,
            char_end,
        });
    }

    (cleaned, meta)
}

/// Remove bracket characters around short, punctuation-free quotations.
fn collapse_short_quotes(text: &str, pattern: &Regex) -> String {
    pattern
        .replace_all(text, |caps: &Captures| {
            let inner = &caps[1];
            let short = inner.chars().count() <= SHORT_QUOTE_MAX_CHARS;
            let plain = !inner
                .chars()
                .any(|c| matches!(c, '、' | '。' | '！' | '？' | ',' | '.' | '!' | '?'));
            if short && plain {
                inner.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
