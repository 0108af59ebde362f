//! The `get_file` retrieval tool offered to the model during collection.

use crate::llm::{ToolCall, ToolDefinition};
use crate::router;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

pub const GET_FILE: &str = "get_file";
pub const SUCCESS: &str = "Success";

/// Arguments the model passes to `get_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFileInput {
    pub absolute_path: String,
    pub class_name: String,
}

/// What the model gets back from `get_file`.
///
/// `result` is `"Success"` or a message starting with `"Error: "`; the optional
/// fields are omitted from the JSON when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<String>>,
}

impl RetrievalResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: format!("Error: {}", message.into()),
            absolute_path: None,
            class_name: None,
            content: None,
            imports: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == SUCCESS
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"result":"Error: unserializable result ({})"}}"#, e)
        })
    }
}

/// Model-facing schema. Property names match the serialized [`GetFileInput`].
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: GET_FILE.to_string(),
        description: "Retrieves the source of a type declaration given the absolute path of the \
                      file expected to declare it and the type's simple name. If the file does not \
                      declare it, files with the same extension under that file's directory are \
                      searched. Responds with JSON: result (\"Success\" or \"Error: ...\"), \
                      absolutePath (file that declares the type), className, content (the \
                      declaration source only) and imports (the file's import statements)."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "absolutePath": {
                    "type": "string",
                    "description": "The absolute path of the file to retrieve."
                },
                "className": {
                    "type": "string",
                    "description": "Simple name of the class, interface, enum or type to find."
                }
            },
            "required": ["absolutePath", "className"]
        }),
    }
}

/// `get_file` bound to one project. Lookups never leave `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetFileTool {
    root: PathBuf,
}

impl GetFileTool {
    /// Binds the tool to `root`, canonicalized when it exists.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Looks the type up. Never fails: every problem becomes an `Error: ...` result.
    pub fn execute(&self, input: &GetFileInput) -> RetrievalResult {
        let requested = Path::new(&input.absolute_path);
        let with_path = |message: String| RetrievalResult {
            absolute_path: Some(input.absolute_path.clone()),
            ..RetrievalResult::error(message)
        };

        let Some(finder) = router::finder_for_path(requested) else {
            debug!("No finder for {}", input.absolute_path);
            return with_path(format!(
                "Unsupported file type at path '{}'.",
                input.absolute_path
            ));
        };

        let Some(path) = resolve_within(&self.root, requested) else {
            debug!(
                "Refusing {}: not under {}",
                input.absolute_path,
                self.root.display()
            );
            return with_path(format!(
                "Path '{}' is outside the project.",
                input.absolute_path
            ));
        };

        match finder.find_within(&self.root, &path, &input.class_name) {
            Ok(Some(location)) => RetrievalResult {
                result: SUCCESS.to_string(),
                absolute_path: Some(location.file_path.to_string_lossy().into_owned()),
                class_name: Some(location.type_name),
                content: Some(location.source_code),
                imports: Some(location.imports),
            },
            Ok(None) => with_path(format!("File not found at path '{}'.", input.absolute_path)),
            Err(e) => {
                debug!("get_file {} failed: {}", input.absolute_path, e);
                with_path(format!("{} (path '{}').", e, input.absolute_path))
            }
        }
    }

    /// Runs a model-issued tool call by name.
    pub fn dispatch(&self, call: &ToolCall) -> RetrievalResult {
        if call.name != GET_FILE {
            return RetrievalResult::error(format!("Unknown tool '{}'.", call.name));
        }
        match serde_json::from_value::<GetFileInput>(call.input.clone()) {
            Ok(input) => self.execute(&input),
            Err(_) => RetrievalResult::error("Invalid input for GetFile tool."),
        }
    }
}

/// Canonical form of `requested` when it lies under `root`.
///
/// Relative paths are taken from `root`. The requested file may not exist yet:
/// its longest existing ancestor is canonicalized and the missing tail must be
/// plain names.
fn resolve_within(root: &Path, requested: &Path) -> Option<PathBuf> {
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let mut existing = joined.as_path();
    let mut missing = Vec::new();
    let mut resolved = loop {
        match existing.canonicalize() {
            Ok(canonical) => break canonical,
            Err(_) => {
                // `file_name` is `None` for a trailing `..`
                missing.push(existing.file_name()?);
                existing = existing.parent()?;
            }
        }
    };
    for name in missing.iter().rev() {
        resolved.push(name);
    }

    resolved.starts_with(root).then_some(resolved)
}
