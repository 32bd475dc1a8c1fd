//! Suggestion providers
//!
//! A provider turns a list of file paths into free-form organization advice.
//! The text is stored on the proposal as an annotation; it never drives
//! moves. The implementation is chosen by `provider.mode` in config.

mod anthropic;
mod chat;
mod fixed;
mod huggingface;
mod prompts;

pub use anthropic::AnthropicProvider;
pub use chat::ChatCompletionsProvider;
pub use fixed::StaticProvider;
pub use huggingface::HuggingFaceProvider;
pub use prompts::{organization_prompt, ORGANIZER_SYSTEM_PROMPT};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::ConfigError;

/// Provider errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Network, authentication or HTTP status failure, or a missing key
    #[error("Suggestion provider unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something that is not a suggestion
    #[error("Suggestion provider returned an invalid response: {0}")]
    ResponseInvalid(String),
}

/// Text-generation capability used during analysis
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Mode name, for logs
    fn name(&self) -> &str;

    async fn suggest(&self, file_paths: &[String]) -> Result<String, ProviderError>;
}

/// Build the provider selected by `config.mode`
pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn SuggestionProvider>, ConfigError> {
    let mode = config.mode.trim().to_lowercase();

    let provider: Arc<dyn SuggestionProvider> = match mode.as_str() {
        "static" => Arc::new(StaticProvider::new(config.static_text.clone())),
        "openai" => Arc::new(ChatCompletionsProvider::openai(config, http_client(config)?)),
        "perplexity" => Arc::new(ChatCompletionsProvider::perplexity(config, http_client(config)?)),
        "bing" => Arc::new(ChatCompletionsProvider::bing(config, http_client(config)?)?),
        "local" => Arc::new(ChatCompletionsProvider::local(config, http_client(config)?)),
        "huggingface" => Arc::new(HuggingFaceProvider::new(config, http_client(config)?)),
        "anthropic" => Arc::new(AnthropicProvider::new(config, http_client(config)?)),
        _ => return Err(ConfigError::UnknownProvider(config.mode.clone())),
    };

    tracing::debug!(mode = provider.name(), "Selected suggestion provider");
    Ok(provider)
}

fn http_client(config: &ProviderConfig) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            key: "provider".to_string(),
            value: format!("HTTP client could not be built: {}", e),
        })
}

/// Non-empty API key from the environment
pub(crate) fn api_key(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Send a request and return the body of a successful response
pub(crate) async fn send_for_text(builder: RequestBuilder) -> Result<String, ProviderError> {
    let response = builder
        .send()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        let preview: String = body.chars().take(300).collect();
        return Err(ProviderError::Unavailable(format!("API error ({}): {}", status, preview)));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: &str) -> ProviderConfig {
        ProviderConfig {
            mode: mode.to_string(),
            endpoint: Some("http://localhost:9/v1/chat/completions".to_string()),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_known_modes() {
        for mode in ["static", "openai", "perplexity", "bing", "local", "huggingface", "anthropic"] {
            let provider = from_config(&config(mode)).unwrap();
            assert_eq!(provider.name(), mode);
        }
    }

    #[test]
    fn test_mode_is_case_insensitive() {
        assert_eq!(from_config(&config(" OpenAI ")).unwrap().name(), "openai");
    }

    #[test]
    fn test_unknown_mode_is_config_error() {
        let result = from_config(&config("gpt-oracle"));
        assert!(matches!(result, Err(ConfigError::UnknownProvider(mode)) if mode == "gpt-oracle"));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = from_config(&ProviderConfig::default()).unwrap();
        let text = provider.suggest(&["/r/a.txt".to_string()]).await.unwrap();
        assert_eq!(text, "group by type");
    }
}
