//! Chat model seam.
//!
//! [`ModelClient`] is the one trait the collection loop and the generation step
//! talk to. The wire types mirror the Anthropic Messages API closely enough that
//! [`AnthropicClient`] serializes them directly; tests plug in scripted clients.

pub mod anthropic;
#[cfg(test)]
pub mod mock;
pub mod usage;

pub use anthropic::{AnthropicClient, Model};
pub use usage::{ApiUsage, Pricing, TokenUsage, UsageTracker};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes a tool's interface for model consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the expected input
    pub input_schema: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Echoed back in the matching tool result
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types this crate does not consume (thinking, images, ...).
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(other)]
    Other,
}

/// One round trip to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    /// Mark the system prompt as cacheable.
    pub cache_system: bool,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatMessage::user_text(user)],
            tools: Vec::new(),
            max_tokens,
            cache_system: true,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub usage: ApiUsage,
}

impl ModelResponse {
    /// Text blocks in order, one per line.
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn wants_tools(&self) -> bool {
        self.stop_reason == Some(StopReason::ToolUse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Rate limited: gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("Authentication failed")]
    Auth,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

/// Anything that can answer a [`ModelRequest`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_response_decodes_blocks() {
        let raw = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Looking up types"},
                {"type": "tool_use", "id": "toolu_1", "name": "get_file",
                 "input": {"absolutePath": "/a/B.kt", "className": "B"}},
                {"type": "thinking", "thinking": "..."}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 3}
        });

        let response: ModelResponse = serde_json::from_value(raw).unwrap();
        assert!(response.wants_tools());
        assert_eq!(response.content[2], ContentBlock::Unsupported);
        assert_eq!(response.text_lines().collect::<Vec<_>>(), vec!["Looking up types"]);

        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_file");
        assert_eq!(calls[0].input["className"], "B");
        assert_eq!(response.usage.input_tokens, 12);
    }

    #[test]
    fn test_unknown_stop_reason() {
        let raw = json!({"content": [], "stop_reason": "pause_turn"});
        let response: ModelResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.stop_reason, Some(StopReason::Other));
        assert!(!response.wants_tools());
    }

    #[test]
    fn test_tool_result_serialization() {
        let ok = ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "{}".to_string(),
            is_error: false,
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "{}"})
        );

        let failed = ContentBlock::ToolResult {
            tool_use_id: "toolu_2".to_string(),
            content: "Error".to_string(),
            is_error: true,
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["is_error"], json!(true));
    }
}
