use crate::llm::Model;
use std::path::{Path, PathBuf};

/// Output directory used when none is given, relative to the project.
pub const DEFAULT_OUTPUT_DIR: &str = ".openapi-scribe";
pub const DEFAULT_OUTPUT_NAME: &str = "openapi";
pub const DEFAULT_API_VERSION: &str = "1.0.0";

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub project_path: PathBuf,
    pub api_key: String,
    pub model: Model,
    pub output_dir: PathBuf,
    /// File stem of the merged document and viewer page
    pub output_name: String,
    pub title: String,
    pub api_version: String,
    /// Validate generated fragments and retry invalid ones
    pub validate: bool,
}

impl Config {
    /// Config with defaults for everything but the project and API key.
    pub fn new(project_path: impl Into<PathBuf>, api_key: impl Into<String>) -> Self {
        let project_path = project_path.into();
        let title = project_path
            .file_name()
            .map(|name| format!("{} API", name.to_string_lossy()))
            .unwrap_or_else(|| "API".to_string());

        Self {
            output_dir: project_path.join(DEFAULT_OUTPUT_DIR),
            project_path,
            api_key: api_key.into(),
            model: Model::default(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            title,
            api_version: DEFAULT_API_VERSION.to_string(),
            validate: true,
        }
    }

    /// Sets the output directory; relative paths resolve against the project.
    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.output_dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.project_path.join(dir)
        };
        self
    }

    pub fn components_dir(&self) -> PathBuf {
        self.output_dir.join("components")
    }

    pub fn fragment_path(&self, stem: &str) -> PathBuf {
        self.components_dir().join(format!("{}.yaml", stem))
    }

    pub fn openapi_dir(&self) -> PathBuf {
        self.output_dir.join("openapi")
    }

    pub fn merged_yaml_path(&self) -> PathBuf {
        self.openapi_dir().join(format!("{}.yaml", self.output_name))
    }

    pub fn viewer_html_path(&self) -> PathBuf {
        self.openapi_dir().join(format!("{}.html", self.output_name))
    }
}
