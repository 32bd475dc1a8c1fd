//! OpenAI-compatible chat completions
//!
//! Serves the `openai`, `perplexity`, `bing` and `local` modes. They differ
//! only in endpoint, model, authentication header and system message.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompts::{organization_prompt, ORGANIZER_SYSTEM_PROMPT};
use super::{api_key, send_for_text, ProviderError, SuggestionProvider};
use crate::config::ProviderConfig;
use crate::error::ConfigError;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai/chat/completions";
const LOCAL_API_URL: &str = "http://localhost:8080/v1/chat/completions";

const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const PERPLEXITY_DEFAULT_MODEL: &str = "mixtral-8x7b-instruct";

/// How the request authenticates
#[derive(Clone)]
enum ChatAuth {
    None,
    /// `Authorization: Bearer` with the key from `env_var`
    Bearer { env_var: &'static str, key: Option<String> },
    /// `Ocp-Apim-Subscription-Key` with the key from `env_var`
    SubscriptionKey { env_var: &'static str, key: Option<String> },
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat completions client for one mode
#[derive(Clone)]
pub struct ChatCompletionsProvider {
    mode: &'static str,
    client: Client,
    endpoint: String,
    model: Option<String>,
    auth: ChatAuth,
    system_prompt: Option<&'static str>,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionsProvider {
    fn base(mode: &'static str, client: Client, endpoint: String, config: &ProviderConfig) -> Self {
        Self {
            mode,
            client,
            endpoint,
            model: config.model.clone(),
            auth: ChatAuth::None,
            system_prompt: None,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn openai(config: &ProviderConfig, client: Client) -> Self {
        let endpoint = config.endpoint.clone().unwrap_or_else(|| OPENAI_API_URL.to_string());
        let mut provider = Self::base("openai", client, endpoint, config);
        provider.model.get_or_insert_with(|| OPENAI_DEFAULT_MODEL.to_string());
        provider.auth = ChatAuth::Bearer {
            env_var: "OPENAI_API_KEY",
            key: api_key("OPENAI_API_KEY"),
        };
        provider
    }

    pub fn perplexity(config: &ProviderConfig, client: Client) -> Self {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| PERPLEXITY_API_URL.to_string());
        let mut provider = Self::base("perplexity", client, endpoint, config);
        provider
            .model
            .get_or_insert_with(|| PERPLEXITY_DEFAULT_MODEL.to_string());
        provider.auth = ChatAuth::Bearer {
            env_var: "PERPLEXITY_API_KEY",
            key: api_key("PERPLEXITY_API_KEY"),
        };
        provider
    }

    /// Azure-hosted chat endpoint; the endpoint must be configured
    pub fn bing(config: &ProviderConfig, client: Client) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| ConfigError::MissingSetting {
            mode: "bing".to_string(),
            what: "provider.endpoint".to_string(),
        })?;
        let mut provider = Self::base("bing", client, endpoint, config);
        provider.auth = ChatAuth::SubscriptionKey {
            env_var: "BING_API_KEY",
            key: api_key("BING_API_KEY"),
        };
        provider.system_prompt = Some(ORGANIZER_SYSTEM_PROMPT);
        Ok(provider)
    }

    /// Locally hosted OpenAI-compatible server, no authentication
    pub fn local(config: &ProviderConfig, client: Client) -> Self {
        let endpoint = config.endpoint.clone().unwrap_or_else(|| LOCAL_API_URL.to_string());
        Self::base("local", client, endpoint, config)
    }

    fn build_request(&self, file_paths: &[String]) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: organization_prompt(file_paths),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn missing_key(env_var: &str) -> ProviderError {
    ProviderError::Unavailable(format!("{} is not set", env_var))
}

#[async_trait]
impl SuggestionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        self.mode
    }

    async fn suggest(&self, file_paths: &[String]) -> Result<String, ProviderError> {
        let request = self.build_request(file_paths);
        let mut builder = self.client.post(&self.endpoint).json(&request);

        builder = match &self.auth {
            ChatAuth::None => builder,
            ChatAuth::Bearer { env_var, key } => {
                let key = key.as_deref().ok_or_else(|| missing_key(env_var))?;
                builder.bearer_auth(key)
            }
            ChatAuth::SubscriptionKey { env_var, key } => {
                let key = key.as_deref().ok_or_else(|| missing_key(env_var))?;
                builder.header("Ocp-Apim-Subscription-Key", key)
            }
        };

        tracing::debug!(mode = self.mode, files = file_paths.len(), "Requesting suggestion");
        let body = send_for_text(builder).await?;
        parse_chat_response(&body)
    }
}

/// First choice's message content, trimmed
pub(crate) fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::ResponseInvalid(format!("Failed to parse response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| ProviderError::ResponseInvalid("response has no message content".to_string()))
}
