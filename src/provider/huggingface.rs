//! Hugging Face inference API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompts::organization_prompt;
use super::{api_key, send_for_text, ProviderError, SuggestionProvider};
use crate::config::ProviderConfig;

const INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_MODEL: &str = "gpt2";

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

pub struct HuggingFaceProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl HuggingFaceProvider {
    pub fn new(config: &ProviderConfig, client: Client) -> Self {
        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            format!("{}/{}", INFERENCE_API_BASE, model)
        });

        Self {
            client,
            endpoint,
            api_key: api_key("HUGGINGFACE_API_KEY"),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl SuggestionProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn suggest(&self, file_paths: &[String]) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable("HUGGINGFACE_API_KEY is not set".to_string()))?;

        let request = InferenceRequest {
            inputs: organization_prompt(file_paths),
            parameters: InferenceParameters {
                max_new_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let builder = self.client.post(&self.endpoint).bearer_auth(api_key).json(&request);
        let body = send_for_text(builder).await?;
        parse_generation_response(&body)
    }
}

/// `generated_text` of the first generation, trimmed
pub(crate) fn parse_generation_response(body: &str) -> Result<String, ProviderError> {
    let generations: Vec<Generation> = serde_json::from_str(body)
        .map_err(|e| ProviderError::ResponseInvalid(format!("Failed to parse response: {}", e)))?;

    generations
        .into_iter()
        .next()
        .map(|g| g.generated_text.trim().to_string())
        .ok_or_else(|| ProviderError::ResponseInvalid("response has no generations".to_string()))
}
