use crate::collector::Collector;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::FragmentGenerator;
use crate::html::generate_viewer_html;
use crate::llm::{ModelClient, TokenUsage, UsageTracker};
use crate::merger::{merge_fragments, write_to_file};
use crate::prompt::{collection_prompt, fragment_prompt};
use crate::retry::{retry, RetryPolicy};
use crate::scanner::ScannedFile;
use crate::tool::GetFileTool;
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FAILURE_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerStatus {
    Succeeded { fragment_path: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerReport {
    pub relative_path: PathBuf,
    pub status: ControllerStatus,
}

/// Tally of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub reports: Vec<ControllerReport>,
    pub succeeded: usize,
    pub failed: usize,
    /// Merged document, when at least one fragment was produced
    pub merged_path: Option<PathBuf>,
    pub viewer_path: Option<PathBuf>,
    pub usage: TokenUsage,
}

/// Processes controllers one after another: collect types, generate a fragment,
/// write it, and finally merge everything into one document.
pub struct Pipeline<'a> {
    client: &'a dyn ModelClient,
    config: &'a Config,
    get_file: GetFileTool,
    retry: RetryPolicy,
    failure_pause: Duration,
    usage: UsageTracker,
}

impl<'a> Pipeline<'a> {
    pub fn new(client: &'a dyn ModelClient, config: &'a Config, usage: UsageTracker) -> Self {
        Self {
            client,
            config,
            get_file: GetFileTool::new(&config.project_path),
            retry: RetryPolicy::default(),
            failure_pause: FAILURE_PAUSE,
            usage,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_failure_pause(mut self, pause: Duration) -> Self {
        self.failure_pause = pause;
        self
    }

    /// Collects and generates the fragment for one controller.
    ///
    /// Collection and generation are retried together when the fragment fails
    /// validation. `Ok(None)` means the model produced no fragment at all.
    pub async fn process(&self, file: &ScannedFile) -> Result<Option<String>> {
        retry(self.retry, Error::is_invalid_fragment, |attempt| async move {
            if attempt > 1 {
                info!("Retrying {} (attempt {})", file.relative_path.display(), attempt);
            }

            let collection = Collector::new(self.client, self.get_file.clone())
                .collect(&collection_prompt(&file.absolute_path, &file.content))
                .await?;

            let prompt = fragment_prompt(
                &collection.summary,
                &file.absolute_path,
                &file.content,
                &collection.files,
            );
            FragmentGenerator::new(self.client)
                .with_validation(self.config.validate)
                .generate(&prompt)
                .await
        })
        .await
    }

    /// Runs every controller, then writes the merged document and viewer.
    ///
    /// A failing controller is reported and the batch moves on.
    ///
    /// # Errors
    ///
    /// Only writing the merged outputs can fail the run as a whole.
    pub async fn run(&self, files: &[ScannedFile]) -> anyhow::Result<RunOutcome> {
        let mut reports = Vec::with_capacity(files.len());
        let mut fragments = Vec::new();
        let mut used_stems = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            info!(
                "[{}/{}] Processing {}",
                index + 1,
                files.len(),
                file.relative_path.display()
            );

            let status = match self.process(file).await {
                Ok(Some(yaml)) => {
                    let stem = unique_stem(&file.absolute_path, &mut used_stems);
                    let fragment_path = self.config.fragment_path(&stem);
                    match write_to_file(&yaml, &fragment_path) {
                        Ok(()) => {
                            fragments.push(yaml);
                            ControllerStatus::Succeeded { fragment_path }
                        }
                        Err(e) => ControllerStatus::Failed {
                            reason: format!("{:#}", e),
                        },
                    }
                }
                Ok(None) => ControllerStatus::Failed {
                    reason: "no OpenAPI fragment generated".to_string(),
                },
                Err(e) => ControllerStatus::Failed {
                    reason: e.to_string(),
                },
            };

            match &status {
                ControllerStatus::Succeeded { fragment_path } => {
                    info!("Wrote {}", fragment_path.display());
                }
                ControllerStatus::Failed { reason } => {
                    warn!("Failed {}: {}", file.relative_path.display(), reason);
                    tokio::time::sleep(self.failure_pause).await;
                }
            }

            reports.push(ControllerReport {
                relative_path: file.relative_path.clone(),
                status,
            });
        }

        let (merged_path, viewer_path) = if fragments.is_empty() {
            (None, None)
        } else {
            let merged = merge_fragments(&fragments, &self.config.title, &self.config.api_version)?;
            if merged.skipped > 0 {
                warn!("{} fragment(s) left out of the merged document", merged.skipped);
            }

            let yaml_path = self.config.merged_yaml_path();
            write_to_file(&merged.yaml, &yaml_path)?;

            let html_path = self.config.viewer_html_path();
            write_to_file(&generate_viewer_html(&merged.yaml, &self.config.title), &html_path)?;

            (Some(yaml_path), Some(html_path))
        };

        let succeeded = reports
            .iter()
            .filter(|r| matches!(r.status, ControllerStatus::Succeeded { .. }))
            .count();

        Ok(RunOutcome {
            failed: reports.len() - succeeded,
            succeeded,
            reports,
            merged_path,
            viewer_path,
            usage: self.usage.snapshot(),
        })
    }
}

/// Snake-case file stem, suffixed with a counter when already taken in this run.
fn unique_stem(path: &Path, used: &mut HashSet<String>) -> String {
    let base = path
        .file_stem()
        .map(|stem| snake_case(&stem.to_string_lossy()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "fragment".to_string());

    let mut stem = base.clone();
    let mut counter = 2;
    while !used.insert(stem.clone()) {
        stem = format!("{}_{}", base, counter);
        counter += 1;
    }
    stem
}

/// `UserController` -> `user_controller`, `HTTPServer` -> `http_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_alphanumeric() || !c.is_ascii() {
            if c.is_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower);
                if boundary && !out.ends_with('_') {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    out.trim_end_matches('_').to_string()
}
