//! Pronunciation annotations and strict LLM response validation.
//!
//! Partial or garbled LLM output must never silently corrupt half a
//! script: any returned entry missing its `index` fails the entire
//! response, and an index that references no requested token is equally
//! fatal.

pub mod llm;

use crate::error::{Result, YomiageError};
use crate::risk::RiskPayload;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use llm::LlmAnnotator;

/// Which script to render a token's replacement in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Original,
    Hiragana,
    Katakana,
}

impl WriteMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "original" => Some(WriteMode::Original),
            "hiragana" => Some(WriteMode::Hiragana),
            "katakana" => Some(WriteMode::Katakana),
            _ => None,
        }
    }
}

/// One decision about how to render a token's pronunciation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub index: usize,
    pub surface: String,
    /// The asserted correct reading, in kana.
    pub llm_reading_kana: String,
    pub write_mode: WriteMode,
    /// Severity used for audit and triage.
    pub risk_level: i64,
    pub reason: String,
}

/// Seam over the adjudication backend. The production implementation is
/// the LLM client; tests substitute scripted fakes.
pub trait Annotator {
    fn annotate(&self, payload: &RiskPayload) -> Result<Vec<Annotation>>;
}

/// Validate and normalize a structured adjudication response.
///
/// The response must be `{"token_annotations": [...]}`. Every entry must
/// carry `index`, and the index must reference a requested token; either
/// violation fails the whole response. Omitted fields are defaulted from
/// the corresponding request item.
pub fn parse_annotation_response(
    value: &serde_json::Value,
    payload: &RiskPayload,
) -> Result<Vec<Annotation>> {
    let entries = value
        .get("token_annotations")
        .and_then(|v| v.as_array())
        .ok_or_else(|| YomiageError::Validation {
            field: "token_annotations".to_string(),
            message: "response is not an object with a token_annotations array".to_string(),
        })?;

    let requested: HashSet<usize> = payload
        .items
        .iter()
        .map(|i| i.token_index)
        .chain(payload.vocab.iter().flat_map(|v| v.token_indices.iter().copied()))
        .collect();

    let mut annotations = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let index = entry
            .get("index")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| YomiageError::Validation {
                field: "index".to_string(),
                message: format!("missing on annotation entry {}", position),
            })? as usize;

        if !requested.contains(&index) {
            return Err(YomiageError::Validation {
                field: "index".to_string(),
                message: format!("annotation entry {} references unknown token {}", position, index),
            });
        }

        let item = payload.items.iter().find(|i| i.token_index == index);
        let surface = entry
            .get("surface")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| item.map(|i| i.surface.clone()))
            .unwrap_or_default();
        let llm_reading_kana = entry
            .get("reading")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| item.map(|i| i.reading_mecab.clone()))
            .unwrap_or_default();

        let write_mode = match entry.get("write_mode").and_then(|v| v.as_str()) {
            Some(raw) => WriteMode::parse(raw).ok_or_else(|| YomiageError::Validation {
                field: "write_mode".to_string(),
                message: format!("unknown value {:?} on annotation entry {}", raw, position),
            })?,
            None => WriteMode::Original,
        };

        annotations.push(Annotation {
            index,
            surface,
            llm_reading_kana,
            write_mode,
            risk_level: entry.get("risk_level").and_then(|v| v.as_i64()).unwrap_or(0),
            reason: entry
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        });
    }

    Ok(annotations)
}
