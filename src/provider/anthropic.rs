//! Anthropic messages API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompts::{organization_prompt, ORGANIZER_SYSTEM_PROMPT};
use super::{api_key, send_for_text, ProviderError, SuggestionProvider};
use crate::config::ProviderConfig;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Message in conversation
#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// API request body
#[derive(Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: &'static str,
    messages: Vec<Message>,
}

/// Content block in API response
#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

pub struct AnthropicProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig, client: Client) -> Self {
        Self {
            client,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: api_key("ANTHROPIC_API_KEY"),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl SuggestionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn suggest(&self, file_paths: &[String]) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable("ANTHROPIC_API_KEY is not set".to_string()))?;

        let request = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: ORGANIZER_SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: organization_prompt(file_paths),
            }],
        };

        let builder = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);

        let body = send_for_text(builder).await?;
        parse_messages_response(&body)
    }
}

/// Concatenated text blocks, trimmed
pub(crate) fn parse_messages_response(body: &str) -> Result<String, ProviderError> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::ResponseInvalid(format!("Failed to parse response: {}", e)))?;

    let text = response
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ProviderError::ResponseInvalid(
            "response has no text content".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}
