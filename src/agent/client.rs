//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::ConfigError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): `OpenAI` and compatible APIs via `async-openai`
/// - `"azure"`: Azure `OpenAI`, with the chat model as deployment id
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AgentConfig) -> Result<Box<dyn LlmProvider>, ConfigError> {
    match config.provider.as_str() {
        "openai" | "azure" => Ok(Box::new(OpenAiProvider::new(config)?)),
        other => Err(ConfigError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .provider(provider)
            .base_url("https://example.openai.azure.com")
            .chat_model("gpt-4o-mini")
            .embed_model("text-embedding-3-small")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_create_openai_provider() {
        let provider = create_provider(&config("openai"));
        assert_eq!(provider.map(|p| p.name()).ok(), Some("openai"));
    }

    #[test]
    fn test_create_azure_provider() {
        let provider = create_provider(&config("azure"));
        assert_eq!(provider.map(|p| p.name()).ok(), Some("azure"));
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&config("unknown"));
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedProvider { ref name }) if name == "unknown"
        ));
    }
}
