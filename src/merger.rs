//! Fragment merging and output writing.
//!
//! Each controller yields one fragment. This module folds all accepted
//! fragments into a single OpenAPI 3.0 document and writes files to disk.

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const VALID_STARTS: &[&str] = &["paths:", "schemas:", "openapi:", "info:", "components:"];

/// Markdown that shows up when a model explains instead of emitting YAML.
static MARKDOWN_ARTIFACTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^\d+\.\s+\*\*",
        r"(?m)^#+\s+",
        r"(?m)^-\s+\*\*",
        r"```",
    ]
    .iter()
    .filter_map(|source| Regex::new(source).ok())
    .collect()
});

#[derive(Serialize)]
struct Info<'a> {
    title: &'a str,
    version: &'a str,
}

#[derive(Serialize)]
struct Components {
    schemas: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct MergedDocument<'a> {
    openapi: &'a str,
    info: Info<'a>,
    paths: BTreeMap<String, Value>,
    components: Components,
}

/// Result of [`merge_fragments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub yaml: String,
    pub merged: usize,
    pub skipped: usize,
}

/// Whether `content` looks like a bare OpenAPI fragment rather than prose.
pub fn is_valid_fragment(content: &str) -> bool {
    let trimmed = content.trim();
    VALID_STARTS.iter().any(|start| trimmed.starts_with(start))
        && !MARKDOWN_ARTIFACTS.iter().any(|re| re.is_match(trimmed))
}

/// Merges fragments into one document.
///
/// Paths from later fragments are merged into earlier ones method by method,
/// the later method winning. Schemas are taken from a top-level `schemas` key or
/// from `components.schemas`; the first definition of a name wins. Output keys
/// are sorted.
///
/// # Arguments
///
/// * `fragments` - Fragment YAML texts in processing order
/// * `title` - `info.title` of the merged document
/// * `version` - `info.version` of the merged document
pub fn merge_fragments(fragments: &[String], title: &str, version: &str) -> Result<MergeOutcome> {
    let mut paths: BTreeMap<String, Value> = BTreeMap::new();
    let mut schemas: BTreeMap<String, Value> = BTreeMap::new();
    let mut merged = 0;
    let mut skipped = 0;

    for fragment in fragments {
        if !is_valid_fragment(fragment) {
            let preview: String = fragment.trim().chars().take(50).collect();
            warn!("Skipping invalid fragment: {}...", preview);
            skipped += 1;
            continue;
        }

        let parsed: Mapping = match serde_yaml::from_str(fragment) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse fragment: {}", e);
                skipped += 1;
                continue;
            }
        };

        if let Some(Value::Mapping(fragment_paths)) = parsed.get("paths") {
            for (path, methods) in fragment_paths {
                let Some(path) = path.as_str() else { continue };
                match paths.get_mut(path) {
                    Some(Value::Mapping(existing)) if methods.is_mapping() => {
                        for (method, operation) in methods.as_mapping().into_iter().flatten() {
                            existing.insert(method.clone(), operation.clone());
                        }
                    }
                    _ => {
                        paths.insert(path.to_string(), methods.clone());
                    }
                }
            }
        }

        let fragment_schemas = parsed
            .get("schemas")
            .or_else(|| parsed.get("components").and_then(|c| c.get("schemas")))
            .and_then(Value::as_mapping);
        if let Some(fragment_schemas) = fragment_schemas {
            for (name, schema) in fragment_schemas {
                if let Some(name) = name.as_str() {
                    schemas
                        .entry(name.to_string())
                        .or_insert_with(|| schema.clone());
                }
            }
        }

        merged += 1;
    }

    debug!(
        "Merged {} fragment(s): {} path(s), {} schema(s)",
        merged,
        paths.len(),
        schemas.len()
    );

    let document = MergedDocument {
        openapi: "3.0.3",
        info: Info { title, version },
        paths,
        components: Components { schemas },
    };
    let yaml = serde_yaml::to_string(&document).context("Failed to serialize merged document")?;

    Ok(MergeOutcome {
        yaml,
        merged,
        skipped,
    })
}

/// Writes content to a file.
///
/// This function writes the provided content to the specified file path.
/// If the parent directories don't exist, they will be created automatically.
/// If the file already exists, it will be overwritten.
///
/// # Arguments
///
/// * `content` - The string content to write
/// * `path` - The file path to write to
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
