use analysis_core::{AnalysisError, NarrativeProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LlmError, LlmResult};
use crate::{LlmConfig, ANTHROPIC_VERSION};

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Anthropic messages API.
#[derive(Clone)]
pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        base_url: String,
        timeout: Duration,
    ) -> LlmResult<Self> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model,
            max_tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: LlmConfig) -> LlmResult<Self> {
        Self::new(
            config.api_key,
            config.model,
            config.max_tokens,
            config.base_url,
            config.timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single-turn prompt and return the first text block of the reply.
    pub async fn complete(&self, prompt: &str) -> LlmResult<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Calling messages API");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout } else { LlmError::RequestFailed(e) })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ServiceUnavailable(format!("Status {status}: {text}")));
        }

        let body = response.text().await?;
        let parsed: MessagesResponse = serde_json::from_str(&body)?;

        parsed
            .content
            .into_iter()
            .filter(|block| block.kind.is_empty() || block.kind == "text")
            .find_map(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("No text content in response".to_string()))
    }
}

#[async_trait]
impl NarrativeProvider for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        ClaudeClient::complete(self, prompt).await.map_err(AnalysisError::from)
    }

    fn provider_name(&self) -> &'static str {
        "Claude"
    }
}
