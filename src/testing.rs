//! Scripted stand-ins for the network backends, used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::agent::message::{ChatRequest, ChatResponse, ModelReply, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::embedding::Embedder;
use crate::error::{AgentError, EmbeddingError};

/// Embeds text as a multi-hot vector over a fixed keyword list.
///
/// Component `i` is 1.0 when the text contains `keywords[i]`. Text matching
/// no keyword embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    calls: Arc<AtomicUsize>,
    drop_last: bool,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            drop_last: false,
        }
    }

    /// Returns one vector too few for every batch.
    pub fn dropping_last(mut self) -> Self {
        self.drop_last = true;
        self
    }

    /// Embedding requests served so far, across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vectors: Vec<Vec<f32>> = texts
            .iter()
            .map(|text| {
                self.keywords
                    .iter()
                    .map(|k| if text.contains(k.as_str()) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }
}

/// An embedder whose every request fails.
#[derive(Debug, Clone, Copy)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::ApiRequest {
            message: "connection refused".to_string(),
        })
    }
}

/// A chat provider that replays a fixed script of replies.
///
/// Records every request it receives. Once the script runs out it either
/// repeats a fixed reply ([`ScriptedProvider::always`]) or fails with
/// [`AgentError::ApiRequest`].
#[derive(Debug)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ModelReply>>,
    repeat: Option<ModelReply>,
    usage: TokenUsage,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            repeat: None,
            usage: TokenUsage::default(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: ModelReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    /// Usage reported with every reply.
    pub const fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .or_else(|| self.repeat.clone());

        let reply = next.ok_or_else(|| AgentError::ApiRequest {
            message: "script exhausted".to_string(),
            status: Some(500),
        })?;

        Ok(ChatResponse {
            reply,
            usage: self.usage,
            finish_reason: None,
        })
    }
}
