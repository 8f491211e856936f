//! AWS Bedrock `InvokeModel` client.
//!
//! Same body as the first-party API, minus `model` (it goes in the path)
//! and plus `anthropic_version`. Requests are signed with SigV4.

use async_trait::async_trait;

use super::response::{message_body, read_response};
use super::sigv4::{self, AwsCredentials, SigningRequest};
use super::{AnalysisClient, AnalysisError};
use crate::capture::CapturedImage;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const SERVICE: &str = "bedrock";

pub struct BedrockClient {
    http: reqwest::Client,
    credentials: AwsCredentials,
    region: String,
    model: String,
}

impl BedrockClient {
    pub fn new(credentials: AwsCredentials, region: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            region,
            model,
        }
    }

    fn host(&self) -> String {
        format!("bedrock-runtime.{}.amazonaws.com", self.region)
    }

    /// Path as sent on the wire. Model ids contain `:`, which must be encoded.
    fn request_path(&self) -> String {
        format!("/model/{}/invoke", sigv4::uri_encode(&self.model))
    }

    /// Path as it appears in the canonical request: every segment encoded
    /// once more, so `%3A` becomes `%253A`.
    fn canonical_path(&self) -> String {
        format!("/model/{}/invoke", sigv4::uri_encode(&sigv4::uri_encode(&self.model)))
    }

    fn request_body(&self, image: &CapturedImage, instruction: &str, max_tokens: u32) -> serde_json::Value {
        let mut body = message_body(image, instruction, max_tokens);
        body["anthropic_version"] = serde_json::Value::String(BEDROCK_ANTHROPIC_VERSION.into());
        body
    }
}

#[async_trait]
impl AnalysisClient for BedrockClient {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn analyze(
        &self,
        image: &CapturedImage,
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, AnalysisError> {
        log::info!("[LLM] Provider: bedrock ({})", self.region);
        log::info!("[LLM] Model: {}", self.model);

        let payload = serde_json::to_vec(&self.request_body(image, instruction, max_tokens))
            .map_err(|e| AnalysisError::Malformed(format!("serializing request: {e}")))?;

        let host = self.host();
        let canonical_uri = self.canonical_path();
        let headers = sigv4::sign(
            &self.credentials,
            &SigningRequest {
                method: "POST",
                host: &host,
                canonical_uri: &canonical_uri,
                payload: &payload,
                region: &self.region,
                service: SERVICE,
            },
            chrono::Utc::now(),
        )
        .map_err(|e| AnalysisError::Auth(format!("signing request: {e}")))?;

        let mut request = self
            .http
            .post(format!("https://{host}{}", self.request_path()))
            .header("content-type", "application/json")
            .header("accept", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let start = std::time::Instant::now();
        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(format!("HTTP request failed: {e}")))?;

        let text = read_response(response).await;
        log::info!("[LLM] API latency: {}ms", start.elapsed().as_millis());
        text
    }
}
