//! Dual pronunciation sources.
//!
//! Every script gets two independent readings: the dictionary reading
//! (concatenated per-token analyzer output) and, for engines that expose a
//! phonetic query, the engine's own kana. Both are kept raw here; the risk
//! scorer normalizes them only at comparison time.

use crate::engine::SpeechEngine;
use crate::error::Result;
use crate::text::chunk::chunk_text;
use crate::text::char_slice;
use crate::tokenize::Token;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which source produced an engine-side reading stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    Engine,
    Dictionary,
}

/// One sentence-bounded block with the engine-side reading for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingBlock {
    pub block_id: usize,
    /// Half-open character span in the preprocessed text.
    pub char_start: usize,
    pub char_end: usize,
    pub text: String,
    /// Raw reading, formatting noise included.
    pub reading: String,
}

/// The assembled engine-side reading of a whole script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReading {
    /// Block readings concatenated with single spaces.
    pub raw: String,
    pub source: ReadingSource,
    pub blocks: Vec<ReadingBlock>,
}

/// Obtain the engine-side reading for the whole text.
///
/// Text is queried in sentence-bounded blocks of at most
/// `kana_query_max_chars` characters (hard fallback to fixed-width cuts
/// for unpunctuated runs); each failed block query is retried once before
/// the failure propagates. Engines without a phonetic query reuse the
/// dictionary reading block by block.
pub fn build_kana_engine(
    engine: &dyn SpeechEngine,
    text: &str,
    tokens: &[Token],
    kana_query_max_chars: usize,
) -> Result<EngineReading> {
    let mut blocks = Vec::new();

    for (stretch_start, stretch_end) in prose_stretches(tokens) {
        let stretch_text = char_slice(text, stretch_start, stretch_end);
        for chunk in chunk_text(&stretch_text, kana_query_max_chars) {
            let char_start = stretch_start + chunk.char_start;
            let char_end = stretch_start + chunk.char_end;
            if chunk.text.trim().is_empty() {
                continue;
            }

            let reading = if engine.supports_kana_query() {
                query_with_retry(engine, &chunk.text)?
            } else {
                dictionary_reading(tokens, char_start, char_end)
            };

            blocks.push(ReadingBlock {
                block_id: blocks.len(),
                char_start,
                char_end,
                text: chunk.text,
                reading,
            });
        }
    }

    let raw = blocks
        .iter()
        .map(|b| b.reading.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let source = if engine.supports_kana_query() {
        ReadingSource::Engine
    } else {
        ReadingSource::Dictionary
    };

    Ok(EngineReading { raw, source, blocks })
}

/// Concatenated dictionary reading for tokens inside a character range.
///
/// Each token contributes its dictionary reading, falling back to its
/// surface when the analyzer produced none. Silence pseudo-tokens carry no
/// reading and are skipped.
pub fn dictionary_reading(tokens: &[Token], char_start: usize, char_end: usize) -> String {
    tokens
        .iter()
        .filter(|t| t.char_start >= char_start && t.char_start < char_end)
        .filter(|t| !t.is_silence() && !t.is_line_break())
        .map(|t| {
            if t.reading_mecab.is_empty() {
                t.surface.as_str()
            } else {
                t.reading_mecab.as_str()
            }
        })
        .collect()
}

/// Maximal character ranges of consecutive prose tokens (silence
/// directives and line breaks split stretches).
fn prose_stretches(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut stretches = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for token in tokens {
        if token.is_silence() || token.is_line_break() {
            if let Some(range) = current.take() {
                stretches.push(range);
            }
            continue;
        }
        current = match current {
            Some((start, _)) => Some((start, token.char_end)),
            None => Some((token.char_start, token.char_end)),
        };
    }
    if let Some(range) = current {
        stretches.push(range);
    }
    stretches
}

fn query_with_retry(engine: &dyn SpeechEngine, text: &str) -> Result<String> {
    match engine.kana_reading(text) {
        Ok(reading) => Ok(reading),
        Err(first) => {
            warn!(error = %first, "kana query failed, retrying once");
            engine.kana_reading(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SynthesizedChunk;
    use crate::error::YomiageError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn token(index: usize, surface: &str, start: usize, reading: &str, pos: &str) -> Token {
        Token {
            index,
            surface: surface.to_string(),
            char_start: start,
            char_end: start + surface.chars().count(),
            reading_mecab: reading.to_string(),
            pos: pos.to_string(),
        }
    }

    /// Engine fake with scripted kana readings and a failure budget.
    struct FakeKanaEngine {
        readings: HashMap<String, String>,
        failures_remaining: RefCell<usize>,
        queries: RefCell<Vec<String>>,
    }

    impl FakeKanaEngine {
        fn new(entries: &[(&str, &str)], failures: usize) -> Self {
            Self {
                readings: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                failures_remaining: RefCell::new(failures),
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl SpeechEngine for FakeKanaEngine {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn supports_kana_query(&self) -> bool {
            true
        }
        fn kana_reading(&self, text: &str) -> Result<String> {
            self.queries.borrow_mut().push(text.to_string());
            let mut failures = self.failures_remaining.borrow_mut();
            if *failures > 0 {
                *failures -= 1;
                return Err(YomiageError::Engine {
                    engine: "fake".to_string(),
                    message: "scripted failure".to_string(),
                });
            }
            self.readings
                .get(text)
                .cloned()
                .ok_or_else(|| YomiageError::Other(format!("unscripted query: {text:?}")))
        }
        fn synthesize(&self, _text: &str) -> Result<SynthesizedChunk> {
            unreachable!("reading tests never synthesize")
        }
    }

    #[test]
    fn engine_reading_is_built_block_by_block() {
        let text = "今日は晴れ。明日は雨。";
        let tokens = vec![
            token(0, "今日", 0, "キョウ", "名詞"),
            token(1, "は", 2, "ワ", "助詞"),
            token(2, "晴れ", 3, "ハレ", "名詞"),
            token(3, "。", 5, "", "記号"),
            token(4, "明日", 6, "アシタ", "名詞"),
            token(5, "は", 8, "ワ", "助詞"),
            token(6, "雨", 9, "アメ", "名詞"),
            token(7, "。", 10, "", "記号"),
        ];
        let engine = FakeKanaEngine::new(
            &[("今日は晴れ。", "キョーワハレ"), ("明日は雨。", "アシタワアメ")],
            0,
        );

        let reading = build_kana_engine(&engine, text, &tokens, 8).unwrap();
        assert_eq!(reading.source, ReadingSource::Engine);
        assert_eq!(reading.blocks.len(), 2);
        assert_eq!(reading.blocks[0].reading, "キョーワハレ");
        assert_eq!(reading.blocks[1].char_start, 6);
        assert_eq!(reading.raw, "キョーワハレ アシタワアメ");
    }

    #[test]
    fn single_failure_is_retried() {
        let tokens = vec![token(0, "晴れ", 0, "ハレ", "名詞")];
        let engine = FakeKanaEngine::new(&[("晴れ", "ハレ")], 1);

        let reading = build_kana_engine(&engine, "晴れ", &tokens, 80).unwrap();
        assert_eq!(reading.raw, "ハレ");
        assert_eq!(engine.queries.borrow().len(), 2);
    }

    #[test]
    fn persistent_failure_propagates() {
        let tokens = vec![token(0, "晴れ", 0, "ハレ", "名詞")];
        let engine = FakeKanaEngine::new(&[("晴れ", "ハレ")], 2);
        assert!(build_kana_engine(&engine, "晴れ", &tokens, 80).is_err());
    }

    #[test]
    fn silence_directives_split_query_blocks() {
        let text = "前半。[2]後半。";
        let tokens = vec![
            token(0, "前半", 0, "ゼンハン", "名詞"),
            token(1, "。", 2, "", "記号"),
            Token {
                index: 2,
                surface: "[2]".to_string(),
                char_start: 3,
                char_end: 6,
                reading_mecab: String::new(),
                pos: crate::defaults::SILENCE_POS.to_string(),
            },
            token(3, "後半", 6, "コウハン", "名詞"),
            token(4, "。", 8, "", "記号"),
        ];
        let engine = FakeKanaEngine::new(
            &[("前半。", "ゼンハン"), ("後半。", "コーハン")],
            0,
        );

        let reading = build_kana_engine(&engine, text, &tokens, 80).unwrap();
        assert_eq!(reading.blocks.len(), 2);
        // The directive itself is never sent to the engine.
        assert!(
            engine
                .queries
                .borrow()
                .iter()
                .all(|q| !q.contains("[2]"))
        );
    }

    #[test]
    fn dictionary_source_reuses_token_readings() {
        struct NoQueryEngine;
        impl SpeechEngine for NoQueryEngine {
            fn name(&self) -> &'static str {
                "noquery"
            }
            fn kana_reading(&self, _text: &str) -> Result<String> {
                Err(YomiageError::Other("no phonetic query".to_string()))
            }
            fn synthesize(&self, _text: &str) -> Result<SynthesizedChunk> {
                unreachable!()
            }
        }

        let text = "今日は";
        let tokens = vec![
            token(0, "今日", 0, "キョウ", "名詞"),
            token(1, "は", 2, "ワ", "助詞"),
        ];
        let reading = build_kana_engine(&NoQueryEngine, text, &tokens, 80).unwrap();
        assert_eq!(reading.source, ReadingSource::Dictionary);
        assert_eq!(reading.raw, "キョウワ");
    }

    #[test]
    fn dictionary_reading_falls_back_to_surface() {
        let tokens = vec![
            token(0, "ABC", 0, "", "名詞"),
            token(1, "会議", 3, "カイギ", "名詞"),
        ];
        assert_eq!(dictionary_reading(&tokens, 0, 5), "ABCカイギ");
    }

    #[test]
    fn unpunctuated_stretch_is_force_chunked_for_querying() {
        let text = "あ".repeat(10);
        let tokens = vec![Token {
            index: 0,
            surface: text.clone(),
            char_start: 0,
            char_end: 10,
            reading_mecab: "ア".repeat(10),
            pos: "名詞".to_string(),
        }];
        let engine = FakeKanaEngine::new(&[("あああああ", "アアアアア")], 0);

        let reading = build_kana_engine(&engine, &text, &tokens, 5).unwrap();
        assert_eq!(reading.blocks.len(), 2);
        assert_eq!(reading.raw, "アアアアア アアアアア");
    }
}
