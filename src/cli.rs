use crate::config::{Config, DEFAULT_API_VERSION, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_NAME};
use crate::llm::{AnthropicClient, Model, UsageTracker};
use crate::pipeline::{ControllerStatus, Pipeline};
use crate::scanner::FileScanner;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI Scribe - Generate OpenAPI documentation from API controllers with an LLM
#[derive(Parser, Debug)]
#[command(name = "openapi-scribe")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Anthropic API key
    #[arg(short = 'k', long = "api-key", env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Model used for collection and generation
    #[arg(short = 'm', long = "model", value_enum, default_value = "haiku")]
    pub model: Model,

    /// Output directory, relative to the project unless absolute
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// File name (without extension) of the merged document and viewer
    #[arg(long = "output-name", default_value = DEFAULT_OUTPUT_NAME)]
    pub output_name: String,

    /// Title of the merged document (defaults to the project directory name)
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Version of the merged document
    #[arg(long = "api-version", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Accept fragments without OpenAPI validation
    #[arg(long = "skip-validation")]
    pub skip_validation: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate already-parsed arguments and resolve them into a [`Config`]
pub fn parse_args_from_parsed(args: CliArgs) -> Result<Config> {
    // The key is omitted so it never ends up in logs
    debug!(
        "Parsed arguments: project={}, model={:?}, output_dir={}",
        args.project_path.display(),
        args.model,
        args.output_dir.display()
    );

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    if args.api_key.trim().is_empty() {
        anyhow::bail!("API key is empty; pass --api-key or set ANTHROPIC_API_KEY");
    }

    if args.output_name.trim().is_empty() || args.output_name.contains(['/', '\\']) {
        anyhow::bail!("Invalid output name: '{}'", args.output_name);
    }

    let project_path = args.project_path.canonicalize().with_context(|| {
        format!(
            "Failed to resolve project path: {}",
            args.project_path.display()
        )
    })?;

    let mut config = Config::new(project_path, args.api_key.trim()).with_output_dir(&args.output_dir);
    config.model = args.model;
    config.output_name = args.output_name;
    config.api_version = args.api_version;
    config.validate = !args.skip_validation;
    if let Some(title) = args.title {
        config.title = title;
    }

    info!("Project path: {}", config.project_path.display());
    info!("Model: {}", config.model.id());
    info!("Output directory: {}", config.output_dir.display());
    if !config.validate {
        info!("Fragment validation: disabled");
    }

    Ok(config)
}

/// Run the main workflow
pub async fn run(config: Config) -> Result<()> {
    info!("Scanning project directory...");
    let scan_result = FileScanner::new(config.project_path.clone()).scan()?;
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }

    let summary = &scan_result.summary;
    info!(
        "Scanned {} files, found {} API controller(s) with ~{} endpoint(s)",
        summary.total_files_scanned, summary.api_files_found, summary.estimated_total_endpoints
    );
    for (language, count) in &summary.by_language {
        info!("  - {}: {}", language, count);
    }
    for (framework, count) in &summary.by_framework {
        debug!("  - framework {}: {}", framework, count);
    }

    if scan_result.files.is_empty() {
        anyhow::bail!("No API controllers found in the project directory");
    }

    let usage = UsageTracker::new();
    let client = AnthropicClient::new(config.api_key.clone(), config.model, usage.clone());
    let pipeline = Pipeline::new(&client, &config, usage);
    let outcome = pipeline.run(&scan_result.files).await?;

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Succeeded: {}", outcome.succeeded);
    info!("  - Failed: {}", outcome.failed);
    for report in &outcome.reports {
        if let ControllerStatus::Failed { reason } = &report.status {
            info!("    {}: {}", report.relative_path.display(), reason);
        }
    }
    info!(
        "  - Tokens: {} input, {} output, {} cached",
        outcome.usage.input_tokens, outcome.usage.output_tokens, outcome.usage.cached_tokens
    );
    info!("  - Estimated cost: ${:.4}", outcome.usage.dollar_cost);

    match (&outcome.merged_path, &outcome.viewer_path) {
        (Some(yaml), Some(html)) => {
            info!("OpenAPI document: {}", yaml.display());
            info!("Viewer: {}", html.display());
            Ok(())
        }
        _ => anyhow::bail!("No controller produced an OpenAPI fragment"),
    }
}
