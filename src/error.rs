use crate::llm::LlmError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller handed a component something it cannot accept, e.g. a `.kt`
    /// file to the Go finder.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("Grammar setup failed: {0}")]
    Grammar(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Generated YAML failed OpenAPI validation. This is the only error the
    /// pipeline retries.
    #[error("Invalid OpenAPI fragment: {0}")]
    InvalidFragment(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_fragment(msg: impl Into<String>) -> Self {
        Self::InvalidFragment(msg.into())
    }

    pub fn is_invalid_fragment(&self) -> bool {
        matches!(self, Self::InvalidFragment(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_fragment_is_marked() {
        assert!(Error::invalid_fragment("bad yaml").is_invalid_fragment());
        assert!(!Error::invalid_input("expected .go file").is_invalid_fragment());
        assert!(!Error::Llm(LlmError::Network("down".to_string())).is_invalid_fragment());
    }

    #[test]
    fn test_parse_error_mentions_file() {
        let err = Error::Parse {
            file: PathBuf::from("/src/User.kt"),
            message: "parser gave up".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("/src/User.kt"));
        assert!(text.contains("parser gave up"));
    }
}
