use async_trait::async_trait;

use super::{ProviderError, SuggestionProvider};

/// Returns the same configured text for every request. Used offline and in
/// tests.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    text: String,
}

impl StaticProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl SuggestionProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn suggest(&self, _file_paths: &[String]) -> Result<String, ProviderError> {
        Ok(self.text.trim().to_string())
    }
}
