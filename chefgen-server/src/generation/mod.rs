//! Recipe text generation: the backend seam, the Gemini client and the model fallback loop.

use std::time::Duration;

use async_trait::async_trait;

pub mod fake;
pub mod gemini;
pub mod orchestrator;

pub use fake::ScriptedBackend;
pub use gemini::GeminiBackend;
pub use orchestrator::{FailureKind, Generated, GenerationError, Generator};

/// Anything that can turn a prompt into text with a named model.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Short name for logs.
    fn backend_name(&self) -> &str;

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, BackendError>;
}

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("[{status}] {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    /// The HTTP status the backend answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Request(e) => e.status().map(|s| s.as_u16()),
            BackendError::Malformed(_) | BackendError::Timeout(_) => None,
        }
    }
}
