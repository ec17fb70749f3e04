//! Text generation backends.
//!
//! - **[`OllamaGenerator`]**: `POST {url}/api/chat`, non-streaming.
//! - **[`OpenAIGenerator`]**: `POST {url}/v1/chat/completions`.
//!
//! Both send the assembled prompt as a single user message at temperature
//! [`TEMPERATURE`] and return the reply text unmodified.

use async_trait::async_trait;
use std::sync::Arc;

pub use docqa_core::generation::{Generator, TEMPERATURE};
use docqa_core::{Error, Result};

use crate::config::{ApiKey, Config, GenerationConfig};
use crate::http::{build_client, post_json};

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.base_url(),
            model: config.model_name(),
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "options": {"temperature": TEMPERATURE},
        });
        let url = format!("{}/api/chat", self.url);
        let json = post_json(&self.client, &url, None, &body, "Ollama").await?;
        parse_ollama_reply(&json)
    }
}

/// Parse `{"message": {"content": "..."}}`.
pub fn parse_ollama_reply(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Backend("invalid Ollama response: missing 'message.content'".into()))
}

pub struct OpenAIGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: ApiKey,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, api_key: ApiKey) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.base_url(),
            model: config.model_name(),
            api_key,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
        });
        let url = format!("{}/v1/chat/completions", self.url);
        let json = post_json(&self.client, &url, Some(&self.api_key), &body, "OpenAI").await?;
        parse_openai_reply(&json)
    }
}

/// Parse `{"choices": [{"message": {"content": "..."}}]}`.
pub fn parse_openai_reply(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            Error::Backend("invalid OpenAI response: missing 'choices[0].message.content'".into())
        })
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    let generation = &config.generation;
    match generation.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(generation)?)),
        "openai" => {
            let key = config.credentials.require()?;
            Ok(Arc::new(OpenAIGenerator::new(generation, key)?))
        }
        other => Err(Error::Config(format!(
            "Unknown generation provider: '{}'. Must be ollama or openai.",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::ErrorKind;

    #[test]
    fn test_parse_ollama_reply() {
        let json = serde_json::json!({
            "model": "gemma3",
            "message": {"role": "assistant", "content": "  Inspect paddies.\n"},
            "done": true
        });
        // Returned verbatim, whitespace included.
        assert_eq!(parse_ollama_reply(&json).unwrap(), "  Inspect paddies.\n");
        let err = parse_ollama_reply(&serde_json::json!({"done": true})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_parse_openai_reply() {
        let json = serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Yes."}}]
        });
        assert_eq!(parse_openai_reply(&json).unwrap(), "Yes.");
        let err = parse_openai_reply(&serde_json::json!({"choices": []})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_create_generator() {
        let generator = create_generator(&Config::default()).unwrap();
        assert_eq!(generator.model_name(), "gemma3");

        let mut config = Config::default();
        config.generation.provider = "openai".into();
        config.credentials.api_key = Some(ApiKey::new("sk-test"));
        assert_eq!(create_generator(&config).unwrap().model_name(), "gpt-4o-mini");

        config.generation.provider = "anthropic".into();
        assert_eq!(
            create_generator(&config).err().map(|e| e.kind()),
            Some(ErrorKind::Config)
        );
    }
}
