/*!
 * LLM provider implementations used to generate English prompts.
 *
 * This module contains client implementations for chat completion services:
 * - OpenRouter: hosted OpenAI-compatible gateway
 * - Mock: scripted provider for tests and offline runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Provider-agnostic completion request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    /// The model to use
    pub model: String,
    /// The messages for the conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Nucleus sampling mass
    pub top_p: f32,
}

impl CompletionRequest {
    /// Create a request with the sampling settings used for prompt generation
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: 0.8,
            max_tokens: 50,
            top_p: 0.9,
        }
    }

    /// Add a user message to the request
    pub fn add_user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Provider-agnostic completion response
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated text of the first choice
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind an `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Model requests are sent to
    fn model(&self) -> &str;

    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = CompletionRequest::new(self.model())
            .add_user_message("Hello")
            .max_tokens(5);
        self.complete(request).await.map(|_| ())
    }
}

pub mod mock;
pub mod openrouter;

pub use mock::{MockBehavior, MockProvider};
pub use openrouter::OpenRouter;
