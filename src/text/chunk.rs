//! Bounded-length text chunking on sentence boundaries.
//!
//! Chunks split on the last sentence-ending punctuation mark at or before
//! the length limit; unpunctuated runs are force-split at exactly the
//! limit. Chunk order is source order, and concatenating chunk texts
//! reproduces the input exactly.

/// Characters treated as sentence boundaries.
const SENTENCE_ENDERS: [char; 6] = ['。', '！', '？', '!', '?', '.'];

/// One bounded chunk with its half-open character span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,
    pub char_start: usize,
    pub char_end: usize,
}

/// Split `text` into chunks of at most `max_len` characters.
///
/// Each split lands after the last sentence ender within the window; when
/// no ender exists in the window, the cut is at exactly `max_len`.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<TextChunk> {
    assert!(max_len > 0, "chunk length limit must be positive");

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let remaining = chars.len() - pos;
        let take = if remaining <= max_len {
            remaining
        } else {
            let window = &chars[pos..pos + max_len];
            match window
                .iter()
                .rposition(|c| SENTENCE_ENDERS.contains(c))
            {
                Some(i) => i + 1,
                None => max_len,
            }
        };

        chunks.push(TextChunk {
            text: chars[pos..pos + take].iter().collect(),
            char_start: pos,
            char_end: pos + take,
        });
        pos += take;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("こんにちは。", 80);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "こんにちは。");
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[0].char_end, 6);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 80).is_empty());
    }

    #[test]
    fn splits_on_last_sentence_ender_in_window() {
        // Two sentences of 6 chars each; limit 10 forces a split after the
        // first ender, not mid-sentence.
        let text = "あいうえお。かきくけこ。";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "あいうえお。");
        assert_eq!(chunks[1].text, "かきくけこ。");
    }

    #[test]
    fn forced_split_for_unpunctuated_run() {
        let text = "あ".repeat(50);
        let chunks = chunk_text(&text, 20);
        let lengths: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();
        assert_eq!(lengths, vec![20, 20, 10]);
    }

    #[test]
    fn every_chunk_respects_the_length_bound() {
        let text = "今日はいい天気です。明日は雨かもしれません！あさっては分かりません";
        for max_len in [5, 8, 12, 30] {
            for chunk in chunk_text(text, max_len) {
                assert!(chunk.text.chars().count() <= max_len);
            }
        }
    }

    #[test]
    fn concatenated_chunks_reproduce_the_input() {
        let text = "一文目。二文目！三文目？そして終わりのない文章がだらだらと続いていく";
        let chunks = chunk_text(text, 9);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn spans_are_contiguous_and_half_open() {
        let text = "あいう。えおか。きくけこさし";
        let chunks = chunk_text(text, 6);
        let mut cursor = 0;
        for chunk in &chunks {
            assert_eq!(chunk.char_start, cursor);
            assert!(chunk.char_end > chunk.char_start);
            cursor = chunk.char_end;
        }
        assert_eq!(cursor, text.chars().count());
    }

    #[test]
    fn ascii_period_counts_as_a_boundary() {
        let text = "abcd.efgh.ijkl";
        let chunks = chunk_text(text, 6);
        assert_eq!(chunks[0].text, "abcd.");
        assert_eq!(chunks[1].text, "efgh.");
        assert_eq!(chunks[2].text, "ijkl");
    }
}
