use crate::error::Result;
use crate::llm::{ChatMessage, ContentBlock, ModelClient, ModelRequest, ToolCall};
use crate::prompt::Prompt;
use crate::tool::{self, GetFileTool, RetrievalResult};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Hard cap on model calls in one collection run.
pub const MAX_ROUNDS: usize = 15;
pub const COLLECTION_MAX_TOKENS: u32 = 5000;
/// Tool calls from one round executed at the same time.
pub const MAX_CONCURRENT_TOOL_CALLS: usize = 10;

/// Declaration source retrieved for one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantFile {
    pub absolute_path: String,
    pub source_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionResult {
    pub summary: String,
    /// Distinct by `absolute_path`, in retrieval order. Further declarations
    /// found in an already collected file are appended to its `source_code`.
    pub files: Vec<RelevantFile>,
}

enum State {
    AwaitingModel,
    ToolRequested {
        assistant: Vec<ContentBlock>,
        calls: Vec<ToolCall>,
        more_requested: bool,
    },
    Done,
}

/// Drives the model through `get_file` calls until it has gathered the types it needs.
pub struct Collector<'a> {
    client: &'a dyn ModelClient,
    tool: GetFileTool,
    max_rounds: usize,
}

impl<'a> Collector<'a> {
    pub fn new(client: &'a dyn ModelClient, tool: GetFileTool) -> Self {
        Self {
            client,
            tool,
            max_rounds: MAX_ROUNDS,
        }
    }

    /// Runs the collection conversation.
    ///
    /// Free text from every round is joined into the summary. Failed tool calls
    /// are handed back to the model as ordinary results; only a failure to reach
    /// the model ends the run with an error.
    pub async fn collect(&self, prompt: &Prompt) -> Result<CollectionResult> {
        let mut request = ModelRequest::new(&prompt.system, &prompt.user, COLLECTION_MAX_TOKENS)
            .with_tools(vec![tool::definition()]);

        let mut summary_lines: Vec<String> = Vec::new();
        let mut files: Vec<RelevantFile> = Vec::new();
        let mut by_path: HashMap<String, usize> = HashMap::new();
        let mut rounds = 0;
        let mut state = State::AwaitingModel;

        loop {
            state = match state {
                State::AwaitingModel if rounds >= self.max_rounds => {
                    warn!("Collection stopped after {} rounds", rounds);
                    State::Done
                }
                State::AwaitingModel => {
                    rounds += 1;
                    let response = self.client.send(&request).await?;
                    summary_lines.extend(response.text_lines().map(str::to_string));

                    let calls = response.tool_calls();
                    debug!("Round {}: {} tool call(s)", rounds, calls.len());

                    if calls.is_empty() {
                        State::Done
                    } else {
                        State::ToolRequested {
                            more_requested: response.wants_tools(),
                            assistant: response.content,
                            calls,
                        }
                    }
                }
                State::ToolRequested {
                    assistant,
                    calls,
                    more_requested,
                } => {
                    let results = run_tools(&self.tool, &calls).await;

                    for result in &results {
                        if let (Some(path), Some(content)) = (&result.absolute_path, &result.content) {
                            match by_path.get(path) {
                                Some(&i) if files[i].source_code.contains(content.as_str()) => {
                                    debug!("Already collected {}", path);
                                }
                                Some(&i) => {
                                    let file = &mut files[i];
                                    file.source_code.push_str("\n\n");
                                    file.source_code.push_str(content);
                                }
                                None => {
                                    by_path.insert(path.clone(), files.len());
                                    files.push(RelevantFile {
                                        absolute_path: path.clone(),
                                        source_code: content.clone(),
                                    });
                                }
                            }
                        }
                    }

                    let tool_results = calls
                        .iter()
                        .zip(&results)
                        .map(|(call, result)| ContentBlock::ToolResult {
                            tool_use_id: call.id.clone(),
                            content: result.to_json(),
                            is_error: !result.is_success(),
                        })
                        .collect();

                    request.messages.push(ChatMessage::assistant(assistant));
                    request.messages.push(ChatMessage::user(tool_results));

                    if more_requested {
                        State::AwaitingModel
                    } else {
                        State::Done
                    }
                }
                State::Done => break,
            };
        }

        info!(
            "Collected {} type(s) in {} round(s)",
            files.len(),
            rounds
        );

        Ok(CollectionResult {
            summary: summary_lines.join("\n").trim().to_string(),
            files,
        })
    }
}

/// Executes one round's tool calls on the blocking pool, results in call order.
async fn run_tools(get_file: &GetFileTool, calls: &[ToolCall]) -> Vec<RetrievalResult> {
    stream::iter(calls.iter().cloned())
        .map(|call| {
            let get_file = get_file.clone();
            async move {
                let name = call.name.clone();
                tokio::task::spawn_blocking(move || get_file.dispatch(&call))
                    .await
                    .unwrap_or_else(|e| {
                        RetrievalResult::error(format!("Tool '{}' failed: {}.", name, e))
                    })
            }
        })
        .buffered(MAX_CONCURRENT_TOOL_CALLS)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::mock::{get_file_response, text_response, ScriptedClient};
    use crate::llm::{ApiUsage, LlmError, StopReason};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn prompt() -> Prompt {
        Prompt {
            system: "collect".to_string(),
            user: "class UserController".to_string(),
        }
    }

    fn get_file_tool(dir: &TempDir) -> GetFileTool {
        GetFileTool::new(dir.path())
    }

    fn kotlin_file(dir: &TempDir, name: &str, code: &str) -> String {
        let path: PathBuf = dir.path().canonicalize().unwrap().join(name);
        fs::write(&path, code).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_single_tool_call_then_summary() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(&temp_dir, "B.kt", "class B(val id: Long)\n");

        let client = ScriptedClient::new()
            .queue(get_file_response("toolu_1", &path, "B"))
            .queue(text_response("User API exposing B"));

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].absolute_path, path);
        assert!(result.files[0].source_code.contains("class B"));
        assert_eq!(result.summary, "User API exposing B");
        assert_eq!(client.calls(), 2);

        // Second request carries the tool_use turn and its result.
        let second = &client.requests()[1];
        assert_eq!(second.messages.len(), 3);
        match &second.messages[2].content[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                is_error,
                content,
            } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert!(!is_error);
                assert!(content.contains("\"result\":\"Success\""));
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stops_at_round_limit() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(&temp_dir, "Loop.kt", "class Loop\n");

        let client = ScriptedClient::new().with_fallback(get_file_response("toolu_x", &path, "Loop"));
        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();

        assert_eq!(client.calls(), MAX_ROUNDS);
        assert_eq!(result.files.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_paths_are_collected_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(&temp_dir, "Order.kt", "class Order\n");

        let both = crate::llm::ModelResponse {
            content: vec![
                ContentBlock::ToolUse {
                    id: "a".to_string(),
                    name: "get_file".to_string(),
                    input: json!({"absolutePath": path, "className": "Order"}),
                },
                ContentBlock::ToolUse {
                    id: "b".to_string(),
                    name: "get_file".to_string(),
                    input: json!({"absolutePath": path, "className": "Order"}),
                },
            ],
            stop_reason: Some(StopReason::ToolUse),
            usage: ApiUsage::default(),
        };

        let client = ScriptedClient::new()
            .queue(both)
            .queue(get_file_response("c", &path, "Order"))
            .queue(text_response("done"));

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_reported_to_model() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("Ghost.kt").to_string_lossy().into_owned();

        let client = ScriptedClient::new()
            .queue(get_file_response("toolu_1", &missing, "Ghost"))
            .queue(text_response("Nothing found"));

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();
        assert!(result.files.is_empty());
        assert_eq!(result.summary, "Nothing found");

        let second = &client.requests()[1];
        match &second.messages[2].content[0] {
            ContentBlock::ToolResult {
                is_error, content, ..
            } => {
                assert!(is_error);
                assert!(content.contains("File not found"));
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_calls_without_tool_use_stop_reason_end_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(&temp_dir, "Item.kt", "class Item\n");

        let mut response = get_file_response("toolu_1", &path, "Item");
        response.stop_reason = Some(StopReason::MaxTokens);
        let client = ScriptedClient::new().queue(response);

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();
        assert_eq!(client.calls(), 1);
        assert_eq!(result.files.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_spans_rounds() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(&temp_dir, "A.kt", "class A\n");

        let mut first = get_file_response("toolu_1", &path, "A");
        first.content.insert(
            0,
            ContentBlock::Text {
                text: "Fetching A".to_string(),
            },
        );
        let client = ScriptedClient::new()
            .queue(first)
            .queue(text_response("A is the payload\n"));

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();
        assert_eq!(result.summary, "Fetching A\nA is the payload");
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let client = ScriptedClient::new().queue_error(LlmError::Network("offline".to_string()));
        let err = Collector::new(&client, GetFileTool::new("/project"))
            .collect(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::Network(_))));
    }

    fn tool_use(id: &str, path: &str, class_name: &str) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: "get_file".to_string(),
            input: json!({"absolutePath": path, "className": class_name}),
        }
    }

    #[tokio::test]
    async fn test_mixed_round_keeps_call_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(&temp_dir, "Money.kt", "data class Money(val cents: Long)\n");
        let ghost = kotlin_file(&temp_dir, "Ghost.kt", "class Other\n");

        let round = crate::llm::ModelResponse {
            content: vec![
                tool_use("found", &path, "Money"),
                tool_use("missing", &ghost, "Ghost"),
            ],
            stop_reason: Some(StopReason::ToolUse),
            usage: ApiUsage::default(),
        };
        let client = ScriptedClient::new()
            .queue(round)
            .queue(text_response("Money only"));

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].absolute_path, path);

        let second = &client.requests()[1];
        let outcomes: Vec<(&str, bool)> = second.messages[2]
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    ..
                } => (tool_use_id.as_str(), *is_error),
                other => panic!("unexpected block {:?}", other),
            })
            .collect();
        assert_eq!(outcomes, vec![("found", false), ("missing", true)]);
    }

    #[tokio::test]
    async fn test_second_type_from_same_file_is_appended() {
        let temp_dir = TempDir::new().unwrap();
        let path = kotlin_file(
            &temp_dir,
            "User.kt",
            "data class User(val id: Long)\n\ndata class CreateUserRequest(val name: String)\n",
        );

        let client = ScriptedClient::new()
            .queue(get_file_response("a", &path, "User"))
            .queue(get_file_response("b", &path, "CreateUserRequest"))
            .queue(get_file_response("c", &path, "User"))
            .queue(text_response("done"));

        let result = Collector::new(&client, get_file_tool(&temp_dir))
            .collect(&prompt())
            .await
            .unwrap();

        assert_eq!(result.files.len(), 1);
        let source = &result.files[0].source_code;
        assert!(source.contains("data class User(val id: Long)"));
        assert!(source.contains("data class CreateUserRequest(val name: String)"));
        assert_eq!(source.matches("data class User(").count(), 1);
    }
}
