//! Scripted model client for unit tests.

use super::{ContentBlock, LlmError, ModelClient, ModelRequest, ModelResponse, StopReason};
use crate::llm::ApiUsage;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued responses in order, then the fallback (if any) forever.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, response: ModelResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    pub fn queue(self, response: ModelResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn queue_error(self, error: LlmError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string())),
        }
    }
}

pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: Some(StopReason::EndTurn),
        usage: ApiUsage::default(),
    }
}

/// A response asking for `get_file(path, class_name)`.
pub fn get_file_response(id: &str, path: &str, class_name: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: "get_file".to_string(),
            input: json!({"absolutePath": path, "className": class_name}),
        }],
        stop_reason: Some(StopReason::ToolUse),
        usage: ApiUsage::default(),
    }
}
