//! Prompt builders for the two model conversations run per controller.

use crate::collector::RelevantFile;
use std::path::Path;

/// System instructions plus the first user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const COLLECTION_SYSTEM: &str = r#"# Type Collector

You are given the source of one API controller. Gather the source of every custom type the
controller's endpoints depend on by calling the `get_file` tool.

## Collect

- Request and response DTOs
- Enums
- Entities exposed through the API
- Types nested inside collected types
- Generic type arguments (e.g. `OrderLine` in `List<OrderLine>`)
- Parent classes and implemented interfaces of collected types

## Do not collect

- Primitive and string types (String, Int, Long, Boolean, Double, Float, number, str, int ...)
- Date and time types (LocalDateTime, LocalDate, Instant, ZonedDateTime, Date, datetime ...)
- Collection types themselves (List, Set, Map, Array, dict ...); their type arguments are collected
- Types from frameworks and third-party libraries (Spring, Jackson, Express, FastAPI, Gin ...)
- Types from standard library packages (java.*, kotlin.*, typing, net/http ...)

## Rules

1. Call `get_file` for each custom type used by the controller. Use the import statements and the
   controller's own path to guess the absolute path of the declaring file.
2. When a retrieved declaration references further custom types, call `get_file` for those too.
3. Several independent calls may be issued in the same turn.
4. Never request a type that was already retrieved.
5. If a call fails, try a different path or name once before giving up on that type.

## Final answer

When nothing is left to collect, reply with a plain-text summary of what the controller exposes
followed by a numbered list of the collected types, one line each with its role and main fields.
Do not describe what you are about to do, do not use code fences and do not use markdown headings
or bold text.
"#;

const FRAGMENT_SYSTEM: &str = r#"# OpenAPI Fragment Writer

Write the OpenAPI 3.0 YAML fragment that documents every endpoint of the given controller.

## Content

- Use only the provided sources. Every referenced type has already been provided.
- Emit a top-level `paths` mapping with one entry per endpoint and a top-level `schemas` mapping
  with one entry per request, response, enum or nested type.
- Reference schemas only as `#/components/schemas/<Name>` and define every schema you reference.
- Give each operation `tags`, `summary`, `description`, `operationId`, its parameters, its
  request body when present and its responses.
- Write detailed descriptions.

## YAML rules

- Indent with exactly two spaces per level. Never use tabs.
- Sequence items start with `- ` at the indentation of their parent key's value.
- Quote any scalar that starts with one of `@ ` * & ! | > % { } [ ] , # ?` or that contains `: `.
- Always quote reference paths: `$ref: '#/components/schemas/Order'`.
- Always quote response codes: `'200':`.
- Write every description as a literal block:
  description: |
    First line of text.
    Second line of text.

## Output

Output the YAML document only. No explanations, no introduction and no code fences.
"#;

/// Prompt for the tool-driven collection conversation.
pub fn collection_prompt(controller_path: &Path, controller_source: &str) -> Prompt {
    Prompt {
        system: COLLECTION_SYSTEM.to_string(),
        user: format!(
            "## Controller to analyze\n\nabsolute file path: {}\nsource code:\n{}",
            controller_path.display(),
            controller_source
        ),
    }
}

/// Prompt for the single-shot fragment generation request.
///
/// # Arguments
///
/// * `summary` - Free text the collection conversation ended with; skipped when blank
/// * `controller_path` - Absolute path of the controller
/// * `controller_source` - Full controller source
/// * `relevant_files` - Every declaration retrieved during collection
pub fn fragment_prompt(
    summary: &str,
    controller_path: &Path,
    controller_source: &str,
    relevant_files: &[RelevantFile],
) -> Prompt {
    let mut user = String::new();

    if !summary.trim().is_empty() {
        user.push_str("## Summary\n");
        user.push_str(summary.trim());
        user.push_str("\n\n");
    }

    user.push_str(&format!(
        "## Controller to analyze\n\nabsolute file path: {}\nsource code:\n{}\n\n## Relevant files\n",
        controller_path.display(),
        controller_source
    ));

    let references: Vec<String> = relevant_files
        .iter()
        .map(|file| {
            format!(
                "absolute file path: {}\nsource code:\n{}",
                file.absolute_path, file.source_code
            )
        })
        .collect();
    user.push_str(&references.join("\n---\n"));

    Prompt {
        system: FRAGMENT_SYSTEM.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_prompt_mentions_tool_and_source() {
        let prompt = collection_prompt(
            Path::new("/app/OrderController.kt"),
            "class OrderController",
        );
        assert!(prompt.system.contains("get_file"));
        assert!(prompt.user.contains("/app/OrderController.kt"));
        assert!(prompt.user.contains("class OrderController"));
    }

    #[test]
    fn test_fragment_prompt_includes_every_file() {
        let files = vec![
            RelevantFile {
                absolute_path: "/app/Order.kt".to_string(),
                source_code: "data class Order(val id: Long)".to_string(),
            },
            RelevantFile {
                absolute_path: "/app/Status.kt".to_string(),
                source_code: "enum class Status { OPEN }".to_string(),
            },
        ];

        let prompt = fragment_prompt(
            "Order API",
            Path::new("/app/OrderController.kt"),
            "class OrderController",
            &files,
        );

        assert!(prompt.user.starts_with("## Summary\nOrder API"));
        assert!(prompt.user.contains("data class Order(val id: Long)"));
        assert!(prompt.user.contains("enum class Status { OPEN }"));
        assert!(prompt.user.contains("\n---\n"));
        assert!(prompt.system.contains("$ref: '#/components/schemas/Order'"));
        assert!(prompt.system.contains("description: |"));
    }

    #[test]
    fn test_blank_summary_is_skipped() {
        let prompt = fragment_prompt("  \n", Path::new("/app/C.py"), "class C: pass", &[]);
        assert!(!prompt.user.contains("## Summary"));
        assert!(prompt.user.starts_with("## Controller to analyze"));
    }
}
