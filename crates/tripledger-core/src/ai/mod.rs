//! Pluggable AI backend abstraction
//!
//! Backends are prompt-driven transports: callers pick a [`PromptId`] and its
//! variables, the backend renders the prompt and returns the raw model text.
//! Turning that text into typed values (and deciding on fallbacks) belongs to
//! the caller, see `schema` and `extraction`.
//!
//! # Architecture
//!
//! - `AIBackend` trait: text and vision completion plus health/identity
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, mock). Default: openai_compatible
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

mod mock;
mod openai_compatible;
pub mod parsing;

pub use mock::MockBackend;
pub use openai_compatible::OpenAICompatibleBackend;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::prompts::PromptId;

/// Template variables passed to a prompt
pub type PromptVars<'a> = HashMap<&'a str, &'a str>;

/// Trait defining the interface for all AI backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Render a text prompt and return the model's answer
    async fn generate_text(&self, prompt: PromptId, vars: &PromptVars<'_>) -> Result<String>;

    /// Render a prompt, attach an image and return the model's answer
    async fn describe_image(
        &self,
        prompt: PromptId,
        vars: &PromptVars<'_>,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Any server implementing `/v1/chat/completions`
    OpenAICompatible(OpenAICompatibleBackend),
    /// Scripted backend for tests and offline use
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None if the selected backend is missing its required variables.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Bound every call by `timeout` (no-op for mock)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_timeout(timeout)),
            AIClient::Mock(b) => AIClient::Mock(b),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate_text(&self, prompt: PromptId, vars: &PromptVars<'_>) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.generate_text(prompt, vars).await,
            AIClient::Mock(b) => b.generate_text(prompt, vars).await,
        }
    }

    async fn describe_image(
        &self,
        prompt: PromptId,
        vars: &PromptVars<'_>,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.describe_image(prompt, vars, image, mime_type).await,
            AIClient::Mock(b) => b.describe_image(prompt, vars, image, mime_type).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_delegates_to_mock() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
        assert_eq!(client.model(), "mock");

        let vars = PromptVars::new();
        let reply = client
            .generate_text(PromptId::DescribeReceipt, &vars)
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }

    #[test]
    fn test_with_timeout_keeps_variant() {
        let client = AIClient::OpenAICompatible(OpenAICompatibleBackend::new(
            "http://localhost:8080/",
            "test-model",
        ))
        .with_timeout(Duration::from_secs(5));
        assert_eq!(client.host(), "http://localhost:8080");
        assert_eq!(client.model(), "test-model");
    }
}
