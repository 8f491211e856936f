//! LLM domain: vision analysis of a captured scoreboard.
//!
//! One trait, [`AnalysisClient`], with two transports:
//! - `anthropic.rs` talks to the first-party Messages API
//! - `bedrock.rs` calls the same model family through AWS, signed by `sigv4.rs`
//!
//! Wire-format handling both share lives in `response.rs`.

mod anthropic;
mod bedrock;
pub mod prompts;
mod response;
pub mod sigv4;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::capture::CapturedImage;
use crate::config::BackendConfig;

pub use anthropic::AnthropicClient;
pub use bedrock::BedrockClient;
pub use prompts::{NOT_SCOREBOARD_MARKER, SCOREBOARD_INSTRUCTION};
pub use response::{check_model_text, strip_code_fences};
pub use sigv4::AwsCredentials;

/// A vision model that turns an image plus instruction into text.
///
/// Implementations return the model's raw text; callers run it through
/// [`check_model_text`] before parsing.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Short name for logs ("anthropic", "bedrock", "mock").
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        image: &CapturedImage,
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, AnalysisError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimit(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("analysis timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("screenshot does not appear to be a scoreboard")]
    NotScoreboard,
}

/// Builds the client for the configured backend.
pub fn client_for(backend: &BackendConfig) -> Arc<dyn AnalysisClient> {
    match backend {
        BackendConfig::Anthropic { api_key, model } => {
            Arc::new(AnthropicClient::new(api_key.clone(), model.clone()))
        }
        BackendConfig::Bedrock { credentials, region, model } => Arc::new(BedrockClient::new(
            credentials.clone(),
            region.clone(),
            model.clone(),
        )),
    }
}
