pub mod providers;
pub mod sqlgen;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// A language-model collaborator: one text prompt in, free text out.
/// No streaming, no multi-turn context; transient failures surface as
/// errors and are never retried here.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct LlmClient {
    provider: Box<dyn Completion>,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider: Box<dyn Completion> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self::from_provider(provider))
    }

    /// Wraps an already-constructed provider; the backend-name dispatch in
    /// `new` is the usual entry point.
    pub fn from_provider(provider: Box<dyn Completion>) -> Self {
        Self { provider }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.provider.complete(prompt).await
    }
}

/// Strips a fenced code block (optionally tagged ```sql) from a model reply.
/// Only the literal fence markers are removed, so the body survives intact
/// even when the whole reply sits on one line. Replies without a closing
/// fence come back trimmed and otherwise untouched.
pub fn strip_code_fence(reply: &str) -> String {
    let trimmed = reply.trim();

    if trimmed.len() > 3 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let body = trimmed
            .strip_prefix("```sql")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }

    trimmed.to_string()
}
