//! Shared request/response handling for the Messages wire format.
//!
//! Both backends speak the same body shape; only transport and auth differ.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::StatusCode;
use serde::Deserialize;

use super::prompts::{NOT_SCOREBOARD_MARKER, USER_MESSAGE};
use super::AnalysisError;
use crate::capture::CapturedImage;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Builds the shared part of the request body: system prompt, one user turn
/// with the image and a short text block.
pub fn message_body(image: &CapturedImage, instruction: &str, max_tokens: u32) -> serde_json::Value {
    serde_json::json!({
        "max_tokens": max_tokens,
        "system": instruction,
        "messages": [
            {
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": image.media_type,
                            "data": STANDARD.encode(&image.bytes),
                        }
                    },
                    { "type": "text", "text": USER_MESSAGE }
                ]
            }
        ]
    })
}

/// Reads a response: non-success statuses become typed errors, success
/// bodies yield the first text block.
pub async fn read_response(response: reqwest::Response) -> Result<String, AnalysisError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AnalysisError::Network(format!("reading response body: {e}")))?;

    if !status.is_success() {
        log::error!("[LLM] API returned {}: {}", status, truncate(&body, 300));
        return Err(error_for_status(status, &body));
    }
    extract_text(&body)
}

/// Maps a non-success status onto the analysis error taxonomy.
pub fn error_for_status(status: StatusCode, body: &str) -> AnalysisError {
    let detail = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));
    match status.as_u16() {
        401 | 403 => AnalysisError::Auth(detail),
        429 | 529 => AnalysisError::RateLimit(detail),
        _ => AnalysisError::Network(detail),
    }
}

/// Pulls the first text block out of a Messages response body and logs
/// token usage.
pub fn extract_text(body: &str) -> Result<String, AnalysisError> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Malformed(format!("response is not valid JSON: {e}")))?;

    if let Some(usage) = &parsed.usage {
        log::info!(
            "[LLM] Tokens: input {}, output {}",
            usage.input_tokens,
            usage.output_tokens
        );
    }

    parsed
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| AnalysisError::Malformed("response has no text block".into()))
}

/// Final gate on model text: strips code fences, rejects blank answers and
/// the not-a-scoreboard sentinel.
pub fn check_model_text(raw: &str) -> Result<String, AnalysisError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(AnalysisError::Malformed("model returned an empty answer".into()));
    }
    if text.starts_with(NOT_SCOREBOARD_MARKER) {
        return Err(AnalysisError::NotScoreboard);
    }
    Ok(text)
}

/// Strip markdown code fences from model text.
///
/// Models sometimes wrap the answer in ``` ... ``` despite being told not to.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let after_open = match trimmed.find('\n') {
            Some(pos) => &trimmed[pos + 1..],
            None => "",
        };
        let stripped = after_open.trim_end();
        match stripped.strip_suffix("```") {
            Some(inner) => inner.trim().to_string(),
            None => after_open.trim().to_string(),
        }
    } else {
        trimmed.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
