//! Default configuration constants for yomiage.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Soft character budget for a single engine kana query.
///
/// VOICEVOX's accent-phrase estimation degrades on long inputs, so texts over
/// this length are split on sentence-ending punctuation before querying.
pub const KANA_QUERY_MAX_CHARS: usize = 80;

/// Maximum characters per synthesis chunk of B-text.
///
/// Chunks are split on the last sentence boundary at or before this length,
/// with a hard fallback to a fixed-width cut for unpunctuated runs.
pub const SYNTH_CHUNK_MAX_CHARS: usize = 120;

/// Pause inserted between chunks of the same line, in seconds.
pub const INTER_CHUNK_PAUSE_SEC: f64 = 0.15;

/// Pause inserted after an ordinary line, in seconds.
pub const LINE_END_PAUSE_SEC: f64 = 0.45;

/// Pause inserted before a heading line, in seconds.
pub const HEADING_PRE_PAUSE_SEC: f64 = 0.8;

/// Pause inserted after a heading line, in seconds.
pub const HEADING_POST_PAUSE_SEC: f64 = 0.6;

/// Bracketed quotations of at most this many characters have their bracket
/// characters removed during preprocessing, so short quoted words do not
/// produce unnatural pauses during synthesis.
pub const SHORT_QUOTE_MAX_CHARS: usize = 6;

/// Timeout for an engine kana/phonetic query, in seconds.
pub const KANA_QUERY_TIMEOUT_SECS: u64 = 10;

/// Timeout for a single chunk synthesis call, in seconds.
pub const SYNTHESIS_TIMEOUT_SECS: u64 = 60;

/// Timeout for one LLM adjudication call, in seconds.
pub const LLM_TIMEOUT_SECS: u64 = 60;

/// Maximum example sentences attached per surface form in a vocabulary-level
/// LLM request.
pub const MAX_EXAMPLES_PER_SURFACE: usize = 3;

/// Default VOICEVOX Engine base URL.
pub const VOICEVOX_BASE_URL: &str = "http://127.0.0.1:50021";

/// Default LLM chat-completions base URL.
pub const LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default LLM model for pronunciation adjudication.
pub const LLM_MODEL: &str = "gpt-4o-mini";

/// Environment variable that selects the synthesis voice.
pub const SPEAKER_ID_ENV: &str = "YOMIAGE_SPEAKER_ID";

/// Environment variable carrying the LLM API key.
pub const LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Part-of-speech tag carried by injected pause pseudo-tokens.
///
/// Silence directives (`[3]`, `[1.5s]`) are split off before morphological
/// analysis and re-inserted as tokens with this tag and an empty reading.
pub const SILENCE_POS: &str = "silence_tag";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kana_query_budget_is_below_synth_chunk_budget() {
        // Engine reading blocks align with synthesis chunks only if the
        // reading query budget is not the larger of the two.
        assert!(KANA_QUERY_MAX_CHARS <= SYNTH_CHUNK_MAX_CHARS);
    }

    #[test]
    fn pauses_are_non_negative() {
        assert!(INTER_CHUNK_PAUSE_SEC >= 0.0);
        assert!(LINE_END_PAUSE_SEC >= 0.0);
        assert!(HEADING_PRE_PAUSE_SEC >= 0.0);
        assert!(HEADING_POST_PAUSE_SEC >= 0.0);
    }
}
