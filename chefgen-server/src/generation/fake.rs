//! A scripted backend for tests and offline runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BackendError, TextBackend};

#[derive(Debug, Clone)]
enum Outcome {
    Text(String),
    Fail { status: u16, message: String },
}

/// Answers per model name from a fixed script and remembers every call.
///
/// Models with no script entry fail with a 404, the way an unknown model would.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: HashMap<String, Outcome>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, model: &str, text: &str) -> Self {
        self.script
            .insert(model.to_string(), Outcome::Text(text.to_string()));
        self
    }

    pub fn fail(mut self, model: &str, status: u16, message: &str) -> Self {
        self.script.insert(
            model.to_string(),
            Outcome::Fail {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    /// Models invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextBackend for ScriptedBackend {
    fn backend_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, model: &str, _prompt: &str) -> Result<String, BackendError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(model.to_string());
        }
        match self.script.get(model) {
            Some(Outcome::Text(text)) => Ok(text.clone()),
            Some(Outcome::Fail { status, message }) => Err(BackendError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Err(BackendError::Api {
                status: 404,
                message: format!("models/{model} is not found"),
            }),
        }
    }
}
