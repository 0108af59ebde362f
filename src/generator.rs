use crate::error::{Error, Result};
use crate::llm::{ModelClient, ModelRequest};
use crate::merger;
use crate::prompt::Prompt;
use crate::validator;
use log::{debug, warn};

pub const GENERATION_MAX_TOKENS: u32 = 20000;

/// Asks the model once for a controller's OpenAPI fragment.
pub struct FragmentGenerator<'a> {
    client: &'a dyn ModelClient,
    validate: bool,
}

impl<'a> FragmentGenerator<'a> {
    pub fn new(client: &'a dyn ModelClient) -> Self {
        Self {
            client,
            validate: true,
        }
    }

    /// Turns structural validation of the output on or off.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Returns the fragment text, or `None` when the model produced nothing.
    ///
    /// # Errors
    ///
    /// Transport errors from the client, and [`Error::InvalidFragment`](crate::error::Error::InvalidFragment)
    /// when validation is on and the output is not a usable OpenAPI fragment.
    pub async fn generate(&self, prompt: &Prompt) -> Result<Option<String>> {
        let request = ModelRequest::new(&prompt.system, &prompt.user, GENERATION_MAX_TOKENS);
        let response = self.client.send(&request).await?;

        let raw: String = response.text_lines().collect();
        let yaml = strip_code_fence(&raw);
        if yaml.is_empty() {
            warn!("Model returned no fragment text");
            return Ok(None);
        }

        if self.validate {
            // The merger only takes fragments of this shape
            if !merger::is_valid_fragment(&yaml) {
                let preview: String = yaml.chars().take(50).collect();
                return Err(Error::invalid_fragment(format!(
                    "fragment must start with a top-level OpenAPI key and contain no markdown: {}...",
                    preview
                )));
            }
            validator::validate_fragment(&yaml)?;
        }

        debug!("Generated fragment of {} bytes", yaml.len());
        Ok(Some(yaml))
    }
}

/// Removes a surrounding Markdown code fence, with or without a `yaml` tag.
pub fn strip_code_fence(raw: &str) -> String {
    let text = raw.trim();
    let text = text.strip_prefix("```yaml").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{text_response, ScriptedClient};
    use pretty_assertions::assert_eq;

    fn prompt() -> Prompt {
        Prompt {
            system: "write yaml".to_string(),
            user: "controller".to_string(),
        }
    }

    const FRAGMENT: &str = "paths:\n  /health:\n    get:\n      responses:\n        '200':\n          description: ok";

    #[test]
    fn test_strip_code_fence() {
        let content = "paths:\n  /a: {}";
        assert_eq!(strip_code_fence(&format!("```yaml\n{}\n```", content)), content);
        assert_eq!(strip_code_fence(&format!("```\n{}\n```", content)), content);
        assert_eq!(strip_code_fence(&format!("  {}\n\n", content)), content);
        assert_eq!(strip_code_fence("```yaml\n```"), "");
    }

    #[tokio::test]
    async fn test_fenced_response_is_unwrapped_and_validated() {
        let client = ScriptedClient::new().queue(text_response(&format!("```yaml\n{}\n```", FRAGMENT)));
        let yaml = FragmentGenerator::new(&client).generate(&prompt()).await.unwrap();
        assert_eq!(yaml.as_deref(), Some(FRAGMENT));

        let request = &client.requests()[0];
        assert_eq!(request.max_tokens, GENERATION_MAX_TOKENS);
        assert!(request.tools.is_empty());
    }

    #[tokio::test]
    async fn test_empty_response_is_none() {
        let client = ScriptedClient::new().queue(text_response("   \n"));
        let yaml = FragmentGenerator::new(&client).generate(&prompt()).await.unwrap();
        assert_eq!(yaml, None);
    }

    #[tokio::test]
    async fn test_invalid_output_is_marked() {
        let client = ScriptedClient::new().queue(text_response("I will analyze the controller."));
        let err = FragmentGenerator::new(&client)
            .generate(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFragment(_)));
    }

    #[tokio::test]
    async fn test_validation_can_be_skipped() {
        let client = ScriptedClient::new().queue(text_response("not: [valid"));
        let yaml = FragmentGenerator::new(&client)
            .with_validation(false)
            .generate(&prompt())
            .await
            .unwrap();
        assert_eq!(yaml.as_deref(), Some("not: [valid"));
    }

    #[tokio::test]
    async fn test_output_the_merger_would_drop_is_invalid() {
        for text in [
            format!("---\n{}", FRAGMENT),
            format!("# Health API\n{}", FRAGMENT),
            format!("{}\n## Notes\nsee above", FRAGMENT),
        ] {
            let client = ScriptedClient::new().queue(text_response(&text));
            let err = FragmentGenerator::new(&client)
                .generate(&prompt())
                .await
                .unwrap_err();
            assert!(err.is_invalid_fragment(), "accepted {:?}", text);
            assert!(!merger::is_valid_fragment(&text));
        }
    }
}
