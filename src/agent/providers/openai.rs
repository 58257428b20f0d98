//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports both the public `OpenAI` API (with an optional base URL override
//! for compatible proxies) and Azure `OpenAI`. On Azure the deployment id is
//! part of the client configuration, so chat and embeddings each get their
//! own [`OpenAiBackend`].

use async_openai::Client;
use async_openai::config::{AzureConfig, OpenAIConfig};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionResponse, CreateEmbeddingRequest,
    CreateEmbeddingResponse, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::agent::tool::ToolCall;
use crate::error::{AgentError, ConfigError};

/// An `async-openai` client for one of the supported backends.
pub(crate) enum OpenAiBackend {
    OpenAi(Client<OpenAIConfig>),
    Azure(Client<AzureConfig>),
}

impl OpenAiBackend {
    /// Builds a client for `config.provider`. `deployment` is only used on
    /// Azure, where it selects the model.
    pub(crate) fn new(config: &AgentConfig, deployment: &str) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                name: "timeout",
                message: format!("cannot build HTTP client: {e}"),
            })?;

        match config.provider.as_str() {
            "openai" => {
                let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
                if let Some(ref base_url) = config.base_url {
                    openai_config = openai_config.with_api_base(base_url);
                }
                Ok(Self::OpenAi(
                    Client::with_config(openai_config).with_http_client(http),
                ))
            }
            "azure" => {
                let base_url = config
                    .base_url
                    .as_deref()
                    .ok_or(ConfigError::MissingSetting {
                        name: "base_url",
                        env: "AZURE_OPENAI_ENDPOINT",
                    })?;
                let azure_config = AzureConfig::new()
                    .with_api_base(base_url)
                    .with_api_version(&config.api_version)
                    .with_deployment_id(deployment)
                    .with_api_key(&config.api_key);
                Ok(Self::Azure(
                    Client::with_config(azure_config).with_http_client(http),
                ))
            }
            other => Err(ConfigError::UnsupportedProvider {
                name: other.to_string(),
            }),
        }
    }

    /// Backend name for logging.
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Azure(_) => "azure",
        }
    }

    pub(crate) async fn chat(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, OpenAIError> {
        match self {
            Self::OpenAi(client) => client.chat().create(request).await,
            Self::Azure(client) => client.chat().create(request).await,
        }
    }

    pub(crate) async fn embed(
        &self,
        request: CreateEmbeddingRequest,
    ) -> Result<CreateEmbeddingResponse, OpenAIError> {
        match self {
            Self::OpenAi(client) => client.embeddings().create(request).await,
            Self::Azure(client) => client.embeddings().create(request).await,
        }
    }
}

/// Chat provider for `OpenAI` and Azure `OpenAI`.
pub struct OpenAiProvider {
    backend: OpenAiBackend,
}

impl OpenAiProvider {
    /// Creates a provider for `config.chat_model`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unknown providers, a missing Azure
    /// endpoint, or an unusable HTTP client.
    pub fn new(config: &AgentConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: OpenAiBackend::new(config, &config.chat_model)?,
        })
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };

                let content = if msg.content.is_empty() {
                    None
                } else {
                    Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    ))
                };

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let (tools, tool_choice) = if request.tools.is_empty() {
            (None, None)
        } else {
            let tools = request
                .tools
                .iter()
                .map(|td| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: td.name.clone(),
                        description: Some(td.description.clone()),
                        parameters: Some(td.parameters.clone()),
                        strict: None,
                    },
                })
                .collect();
            (Some(tools), Some(ChatCompletionToolChoiceOption::Auto))
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            tools,
            tool_choice,
            ..Default::default()
        }
    }

    /// Extracts the reply, usage and finish reason from an SDK response.
    fn parse_response(response: CreateChatCompletionResponse) -> ChatResponse {
        let choice = response.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let (content, tool_calls) = choice.map_or_else(Default::default, |c| {
            let tool_calls = c
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                })
                .collect();
            (c.message.content.unwrap_or_default(), tool_calls)
        });

        let mut parsed = ChatResponse::from_parts(content, tool_calls);
        parsed.finish_reason = finish_reason;
        parsed.usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
        parsed
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("backend", &self.backend.kind())
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.backend.kind()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);

        let response = self
            .backend
            .chat(openai_request)
            .await
            .map_err(|e| AgentError::ApiRequest {
                status: match &e {
                    OpenAIError::Reqwest(err) => err.status().map(|s| s.as_u16()),
                    _ => None,
                },
                message: e.to_string(),
            })?;

        let parsed = Self::parse_response(response);
        debug!(
            finish_reason = parsed.finish_reason.as_deref().unwrap_or("none"),
            total_tokens = parsed.usage.total_tokens,
            "chat completion received"
        );
        Ok(parsed)
    }
}
