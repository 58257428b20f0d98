//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default output token cap per model call.
const DEFAULT_MAX_TOKENS: u32 = 1200;
/// Default model calls per run.
pub const DEFAULT_MAX_STEPS: usize = 6;
/// Default texts per embedding request.
const DEFAULT_EMBED_BATCH_SIZE: usize = 64;
/// Default embedding requests in flight during an index build.
const DEFAULT_EMBED_CONCURRENCY: usize = 4;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default Azure `OpenAI` API version.
const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

/// Configuration for the chat and embedding backends and the reasoning loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Backend name: `"azure"` or `"openai"`.
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Endpoint (Azure resource URL) or base URL override (`OpenAI`).
    pub base_url: Option<String>,
    /// Azure API version.
    pub api_version: String,
    /// Chat model (Azure: deployment name).
    pub chat_model: String,
    /// Embedding model (Azure: deployment name).
    pub embed_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token cap per model call.
    pub max_tokens: u32,
    /// Model calls per run before the step budget is exhausted.
    pub max_steps: usize,
    /// Texts per embedding request.
    pub embed_batch_size: usize,
    /// Embedding requests in flight during an index build.
    pub embed_concurrency: usize,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Directory containing prompt overrides.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if a required value is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    api_version: Option<String>,
    chat_model: Option<String>,
    embed_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_steps: Option<usize>,
    embed_batch_size: Option<usize>,
    embed_concurrency: Option<usize>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    // Unparsed environment values, checked in `build`.
    max_steps_raw: Option<String>,
    embed_batch_size_raw: Option<String>,
}

/// Parses a count read from the environment.
fn parse_count(name: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue {
            name,
            message: format!("{raw:?} is not a non-negative integer ({e})"),
        })
}

/// First non-empty value among the named environment variables.
fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env_any(&["MAMO_PROVIDER"]);
        }
        if self.api_key.is_none() {
            self.api_key = env_any(&["AZURE_OPENAI_API_KEY", "OPENAI_API_KEY"]);
        }
        if self.base_url.is_none() {
            self.base_url = env_any(&["AZURE_OPENAI_ENDPOINT", "OPENAI_BASE_URL"]);
            // An Azure endpoint implies the Azure backend unless told otherwise.
            if self.provider.is_none() && env_any(&["AZURE_OPENAI_ENDPOINT"]).is_some() {
                self.provider = Some("azure".to_string());
            }
        }
        if self.api_version.is_none() {
            self.api_version = env_any(&["AZURE_OPENAI_API_VERSION"]);
        }
        if self.chat_model.is_none() {
            self.chat_model = env_any(&["AZURE_OPENAI_CHAT_MODEL", "MAMO_CHAT_MODEL"]);
        }
        if self.embed_model.is_none() {
            self.embed_model = env_any(&["AZURE_OPENAI_EMBED_MODEL", "MAMO_EMBED_MODEL"]);
        }
        if self.max_steps.is_none() {
            self.max_steps_raw = env_any(&["MAMO_MAX_STEPS"]);
        }
        if self.embed_batch_size.is_none() {
            self.embed_batch_size_raw = env_any(&["MAMO_EMBED_BATCH_SIZE"]);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_any(&["MAMO_PROMPT_DIR"]).map(PathBuf::from);
        }
        self
    }

    /// Sets the backend name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the endpoint / base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the Azure API version.
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the output token cap.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the step budget.
    #[must_use]
    pub const fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Sets the embedding batch size.
    #[must_use]
    pub const fn embed_batch_size(mut self, n: usize) -> Self {
        self.embed_batch_size = Some(n);
        self
    }

    /// Sets the embedding concurrency.
    #[must_use]
    pub const fn embed_concurrency(mut self, n: usize) -> Self {
        self.embed_concurrency = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt override directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingSetting`] if the API key, chat model or
    ///   embedding model is unset, or the Azure endpoint is missing.
    /// - [`ConfigError::InvalidValue`] for a zero or non-numeric step budget
    ///   or batch size.
    pub fn build(self) -> Result<AgentConfig, ConfigError> {
        let api_key = self.api_key.ok_or(ConfigError::MissingSetting {
            name: "api_key",
            env: "AZURE_OPENAI_API_KEY or OPENAI_API_KEY",
        })?;
        let chat_model = self.chat_model.ok_or(ConfigError::MissingSetting {
            name: "chat_model",
            env: "AZURE_OPENAI_CHAT_MODEL or MAMO_CHAT_MODEL",
        })?;
        let embed_model = self.embed_model.ok_or(ConfigError::MissingSetting {
            name: "embed_model",
            env: "AZURE_OPENAI_EMBED_MODEL or MAMO_EMBED_MODEL",
        })?;

        let provider = self.provider.unwrap_or_else(|| "openai".to_string());
        if provider == "azure" && self.base_url.is_none() {
            return Err(ConfigError::MissingSetting {
                name: "base_url",
                env: "AZURE_OPENAI_ENDPOINT",
            });
        }

        let max_steps = match (self.max_steps, self.max_steps_raw.as_deref()) {
            (Some(n), _) => n,
            (None, Some(raw)) => parse_count("max_steps", raw)?,
            (None, None) => DEFAULT_MAX_STEPS,
        };
        if max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_steps",
                message: "must be at least 1".to_string(),
            });
        }
        let embed_batch_size = match (self.embed_batch_size, self.embed_batch_size_raw.as_deref()) {
            (Some(n), _) => n,
            (None, Some(raw)) => parse_count("embed_batch_size", raw)?,
            (None, None) => DEFAULT_EMBED_BATCH_SIZE,
        };
        if embed_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "embed_batch_size",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(AgentConfig {
            provider,
            api_key,
            base_url: self.base_url,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            chat_model,
            embed_model,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            max_steps,
            embed_batch_size,
            embed_concurrency: self
                .embed_concurrency
                .unwrap_or(DEFAULT_EMBED_CONCURRENCY)
                .max(1),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        })
    }
}
