//! Chat completion abstraction used by the AI analyzer

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    /// Ask the provider for a JSON object response
    pub json_response: bool,
}

/// A single completion call. Implementations do not retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the content of the first choice
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
