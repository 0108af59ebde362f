//! OpenAPI Scribe - OpenAPI documentation from API controllers, written by a language model.
//!
//! Static analysis finds controller files; a model then reads each controller, pulls
//! in the request and response types it needs through a `get_file` tool backed by
//! tree-sitter, and writes an OpenAPI fragment. Fragments are validated, merged into
//! one document and rendered as a standalone HTML page.
//!
//! # Supported Languages
//!
//! Kotlin, Java, TypeScript, JavaScript, Python and Go.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Finds API controller files and estimates their endpoints
//! 2. [`syntax_index`] - Parses a source file and locates declarations and imports
//! 3. [`type_finder`] / [`router`] - Finds a named type on disk, per language
//! 4. [`tool`] - The `get_file` retrieval tool exposed to the model
//! 5. [`collector`] - Multi-round tool conversation gathering relevant files
//! 6. [`generator`] / [`validator`] - Fragment generation and OpenAPI validation
//! 7. [`pipeline`] - Per-controller retries, output files and merging
//! 8. [`merger`] / [`html`] - The merged document and its viewer page
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_scribe::{
//!     config::Config,
//!     llm::{AnthropicClient, Model, UsageTracker},
//!     pipeline::Pipeline,
//!     scanner::FileScanner,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new("/work/my-service", "sk-...");
//! let scan_result = FileScanner::new(config.project_path.clone()).scan()?;
//!
//! let usage = UsageTracker::new();
//! let client = AnthropicClient::new(config.api_key.clone(), Model::Haiku, usage.clone());
//! let outcome = Pipeline::new(&client, &config, usage)
//!     .run(&scan_result.files)
//!     .await?;
//!
//! println!("{} succeeded, {} failed", outcome.succeeded, outcome.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod generator;
pub mod html;
pub mod language;
pub mod llm;
pub mod merger;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod router;
pub mod scanner;
pub mod syntax_index;
pub mod tool;
pub mod type_finder;
pub mod validator;
