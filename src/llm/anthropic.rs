//! First-party Messages API client.

use async_trait::async_trait;

use super::response::{message_body, read_response};
use super::{AnalysisClient, AnalysisError};
use crate::capture::CapturedImage;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn request_body(&self, image: &CapturedImage, instruction: &str, max_tokens: u32) -> serde_json::Value {
        let mut body = message_body(image, instruction, max_tokens);
        body["model"] = serde_json::Value::String(self.model.clone());
        body
    }
}

#[async_trait]
impl AnalysisClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn analyze(
        &self,
        image: &CapturedImage,
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, AnalysisError> {
        log::info!("[LLM] Provider: anthropic");
        log::info!("[LLM] Model: {}", self.model);

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(image, instruction, max_tokens))
            .send()
            .await
            .map_err(|e| AnalysisError::Network(format!("HTTP request failed: {e}")))?;

        let text = read_response(response).await;
        log::info!("[LLM] API latency: {}ms", start.elapsed().as_millis());
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_names_the_model() {
        let client = AnthropicClient::new("sk".into(), "claude-sonnet-4-6".into());
        let image = CapturedImage {
            bytes: vec![0],
            media_type: "image/jpeg",
            width: 1,
            height: 1,
            looks_like_scoreboard: false,
        };
        let body = client.request_body(&image, "SYS", 100);
        assert_eq!(body["model"], "claude-sonnet-4-6");
        assert_eq!(body["max_tokens"], 100);
        assert!(body.get("anthropic_version").is_none());
    }
}
