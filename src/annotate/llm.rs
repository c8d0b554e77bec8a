//! Chat-completions client for pronunciation adjudication.
//!
//! Sends the risk payload to an OpenAI-compatible endpoint with a JSON
//! response format and validates the structured reply. Only HTTP 429 is
//! retried (with backoff); every other failure propagates to the caller,
//! which decides whether to re-run, escalate to a human queue, or abort.

use crate::annotate::{parse_annotation_response, Annotation, Annotator};
use crate::config::LlmConfig;
use crate::defaults::{LLM_API_KEY_ENV, LLM_TIMEOUT_SECS};
use crate::error::{Result, YomiageError};
use crate::risk::RiskPayload;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const RATE_LIMIT_MAX_RETRIES: usize = 3;
const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_secs(2);

const SYSTEM_PROMPT: &str = "あなたは日本語ナレーション原稿の読み方を校正する専門家です。\
与えられたトークンごとに正しい読みを判定し、JSONオブジェクト \
{\"token_annotations\": [{\"index\": トークン番号, \"reading\": \"カタカナ読み\", \
\"write_mode\": \"original\" | \"hiragana\" | \"katakana\", \"risk_level\": 0-3, \
\"reason\": \"判定理由\"}]} のみを返してください。読み替えが不要な場合は \
write_mode を original にしてください。";

pub struct LlmAnnotator {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmAnnotator {
    /// Build the annotator, failing fast when no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| YomiageError::ConfigInvalidValue {
                key: "llm.api_key".to_string(),
                message: format!("set {} or configure llm.api_key", LLM_API_KEY_ENV),
            })?;
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(YomiageError::Http)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(&self, payload: &RiskPayload) -> Result<serde_json::Value> {
        let user_content = serde_json::to_string_pretty(payload)?;
        Ok(json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_content},
            ],
            "response_format": {"type": "json_object"},
        }))
    }
}

impl Annotator for LlmAnnotator {
    fn annotate(&self, payload: &RiskPayload) -> Result<Vec<Annotation>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(payload)?;

        let mut attempt = 0usize;
        let mut delay = RATE_LIMIT_BASE_DELAY;
        let text = loop {
            attempt += 1;
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
                .send()?;

            let status = response.status();
            let retry_after = retry_after_secs(response.headers());
            let text = response.text().unwrap_or_default();
            if status.is_success() {
                break text;
            }
            if status.as_u16() == 429 && attempt < RATE_LIMIT_MAX_RETRIES {
                let wait = retry_after.map(Duration::from_secs).unwrap_or(delay);
                warn!(attempt, wait_secs = wait.as_secs(), "LLM rate limited, backing off");
                std::thread::sleep(wait);
                delay *= 2;
                continue;
            }
            return Err(YomiageError::Llm {
                message: format!("chat completion returned {}: {}", status, text),
            });
        };

        let content = extract_message_content(&text)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| YomiageError::Llm {
                message: format!("response content is not valid JSON: {}", e),
            })?;
        let annotations = parse_annotation_response(&value, payload)?;
        info!(
            requested = payload.items.len(),
            returned = annotations.len(),
            "adjudication complete"
        );
        Ok(annotations)
    }
}

fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Pull the assistant message content out of a chat-completion response.
fn extract_message_content(text: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct ChatResponse {
        choices: Vec<Choice>,
    }
    #[derive(Deserialize)]
    struct Choice {
        message: Message,
    }
    #[derive(Deserialize)]
    struct Message {
        content: Option<String>,
    }

    let parsed: ChatResponse = serde_json::from_str(text).map_err(|e| YomiageError::Llm {
        message: format!("failed to parse chat completion response: {}", e),
    })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| YomiageError::Llm {
            message: "chat completion response has no message content".to_string(),
        })
}
