//! OpenAPI Scribe - Command-line tool for generating OpenAPI documentation.
//!
//! Scans a project for API controllers, lets a model collect the types each
//! controller depends on, and writes one merged OpenAPI 3.0 document plus a
//! browsable HTML viewer.
//!
//! # Usage
//!
//! ```bash
//! openapi-scribe [OPTIONS] --api-key <API_KEY> <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate documentation with the key from the environment:
//! ```bash
//! ANTHROPIC_API_KEY=sk-... openapi-scribe ./my-service
//! ```
//!
//! Use the larger model and a custom output directory:
//! ```bash
//! openapi-scribe ./my-service -m sonnet -o docs/api
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_scribe::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse once so the verbose flag is known before the logger exists
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI Scribe starting...");

    let config = cli::parse_args_from_parsed(args)?;
    cli::run(config).await?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
