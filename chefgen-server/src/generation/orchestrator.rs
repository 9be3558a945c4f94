use std::sync::Arc;
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;

use super::{BackendError, TextBackend};
use crate::config::GenerationConfig;

/// Why a single model attempt failed. Drives both logging and the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FailureKind {
    InvalidCredentials,
    ModelUnavailable,
    QuotaExceeded,
    Other,
}

impl FailureKind {
    pub fn classify(error: &BackendError) -> FailureKind {
        match error.status() {
            Some(401 | 403) => return FailureKind::InvalidCredentials,
            Some(404) => return FailureKind::ModelUnavailable,
            Some(429) => return FailureKind::QuotaExceeded,
            _ => {}
        }
        // Transport errors carry the request URL, which always mentions "models/".
        if matches!(error, BackendError::Request(_) | BackendError::Timeout(_)) {
            return FailureKind::Other;
        }
        let message = error.to_string();
        let mentions = |needles: &[&str]| needles.iter().any(|n| message.contains(n));
        if mentions(&["API key", "API_KEY"]) {
            FailureKind::InvalidCredentials
        } else if mentions(&["model", "Model", "not found", "404"]) {
            FailureKind::ModelUnavailable
        } else if mentions(&["quota", "QUOTA", "429", "RESOURCE_EXHAUSTED"]) {
            FailureKind::QuotaExceeded
        } else {
            FailureKind::Other
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("No models are configured")]
    NoModels,
    #[error("All {attempts} models failed, the last ({model}) with: {source}")]
    Exhausted {
        attempts: usize,
        model: String,
        source: BackendError,
    },
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationError::NoModels => FailureKind::Other,
            GenerationError::Exhausted { source, .. } => FailureKind::classify(source),
        }
    }
}

/// Text from the first model that answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub model: String,
}

/// Tries each configured model in turn until one produces text.
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn TextBackend>,
    models: Vec<String>,
    attempt_timeout: Option<Duration>,
    quota_backoff: Duration,
}

impl Generator {
    pub fn new(backend: Arc<dyn TextBackend>, models: Vec<String>) -> Self {
        Self {
            backend,
            models,
            attempt_timeout: None,
            quota_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(backend: Arc<dyn TextBackend>, config: &GenerationConfig) -> Self {
        Self::new(backend, config.models.clone())
            .with_attempt_timeout(config.attempt_timeout_secs.map(Duration::from_secs))
            .with_quota_backoff(Duration::from_millis(config.quota_backoff_ms))
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_quota_backoff(mut self, backoff: Duration) -> Self {
        self.quota_backoff = backoff;
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Delays to wait after successive quota failures, doubling from the configured base.
    fn quota_delays(&self) -> Option<ExponentialBackoff> {
        let base_ms = self.quota_backoff.as_millis() as u64;
        (base_ms > 0).then(|| {
            // 2^n * factor gives base, 2 * base, 4 * base...
            ExponentialBackoff::from_millis(2)
                .factor((base_ms / 2).max(1))
                .max_delay(Duration::from_secs(30))
        })
    }

    async fn attempt(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.generate(model, prompt))
                .await
                .map_err(|_| BackendError::Timeout(limit))?,
            None => self.backend.generate(model, prompt).await,
        }
    }

    /// Run the prompt through the models in order, returning the first success.
    ///
    /// Stops at the first model that answers. If none do, the last failure is returned.
    pub async fn generate(&self, prompt: &str) -> Result<Generated, GenerationError> {
        let mut quota_delays = self.quota_delays();
        let mut last_failure = None;
        for (index, model) in self.models.iter().enumerate() {
            tracing::info!(model = %model, backend = self.backend.backend_name(), "Trying model");
            let error = match self.attempt(model, prompt).await {
                Ok(text) => {
                    tracing::info!(model = %model, "Model answered");
                    return Ok(Generated {
                        text,
                        model: model.clone(),
                    });
                }
                Err(error) => error,
            };
            let kind = FailureKind::classify(&error);
            let message: String = error.to_string().chars().take(200).collect();
            tracing::warn!(model = %model, %kind, error = %message, "Model failed");

            let more_to_try = index + 1 < self.models.len();
            if kind == FailureKind::QuotaExceeded && more_to_try {
                if let Some(delay) = quota_delays.as_mut().and_then(Iterator::next) {
                    tracing::info!(?delay, "Quota exceeded, pausing before the next model");
                    tokio::time::sleep(delay).await;
                }
            }
            last_failure = Some((model.clone(), error));
        }
        match last_failure {
            Some((model, source)) => Err(GenerationError::Exhausted {
                attempts: self.models.len(),
                model,
                source,
            }),
            None => Err(GenerationError::NoModels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ScriptedBackend;
    use async_trait::async_trait;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail("a", 404, "models/a is not found")
                .fail("b", 500, "Internal error")
                .succeed("c", "soup text")
                .succeed("d", "never used"),
        );
        let generator = Generator::new(backend.clone(), models(&["a", "b", "c", "d"]));
        let generated = generator.generate("prompt").await.unwrap();
        assert_eq!(
            generated,
            Generated {
                text: "soup text".into(),
                model: "c".into()
            }
        );
        assert_eq!(backend.calls(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn returns_the_last_failure() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail("a", 404, "models/a is not found")
                .fail("b", 429, "RESOURCE_EXHAUSTED: quota"),
        );
        let generator = Generator::new(backend.clone(), models(&["a", "b"]));
        let err = generator.generate("prompt").await.unwrap_err();
        match &err {
            GenerationError::Exhausted {
                attempts, model, ..
            } => {
                assert_eq!(*attempts, 2);
                assert_eq!(model, "b");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.kind(), FailureKind::QuotaExceeded);
        assert_eq!(backend.calls(), ["a", "b"]);
    }

    #[tokio::test]
    async fn no_models_is_an_error() {
        let generator = Generator::new(Arc::new(ScriptedBackend::new()), vec![]);
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::NoModels));
    }

    struct Stuck;

    #[async_trait]
    impl TextBackend for Stuck {
        fn backend_name(&self) -> &str {
            "stuck"
        }

        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, BackendError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_models_time_out() {
        let generator = Generator::new(Arc::new(Stuck), models(&["slow"]))
            .with_attempt_timeout(Some(Duration::from_secs(5)));
        let err = generator.generate("prompt").await.unwrap_err();
        match err {
            GenerationError::Exhausted { source, .. } => {
                assert!(matches!(source, BackendError::Timeout(d) if d == Duration::from_secs(5)))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn quota_failures_pause_before_moving_on() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail("a", 429, "quota")
                .fail("b", 429, "quota")
                .succeed("c", "ok"),
        );
        let generator = Generator::new(backend.clone(), models(&["a", "b", "c"]))
            .with_quota_backoff(Duration::from_millis(400));
        let started = tokio::time::Instant::now();
        generator.generate("prompt").await.unwrap();
        // 400ms after "a", 800ms after "b"
        assert_eq!(started.elapsed(), Duration::from_millis(1200));
    }

    #[test]
    fn status_wins_over_message() {
        let quota_mentioning_model = BackendError::Api {
            status: 429,
            message: "Quota exceeded for model gemini-2.5-pro".into(),
        };
        assert_eq!(
            FailureKind::classify(&quota_mentioning_model),
            FailureKind::QuotaExceeded
        );
    }

    #[test]
    fn message_fallback_follows_fixed_order() {
        let classify = |status, message: &str| {
            FailureKind::classify(&BackendError::Api {
                status,
                message: message.into(),
            })
        };
        assert_eq!(
            classify(400, "API key not valid. Please pass a valid API key."),
            FailureKind::InvalidCredentials
        );
        assert_eq!(
            classify(400, "Model is overloaded"),
            FailureKind::ModelUnavailable
        );
        assert_eq!(
            classify(503, "RESOURCE_EXHAUSTED: try later"),
            FailureKind::QuotaExceeded
        );
        assert_eq!(classify(500, "Internal error"), FailureKind::Other);
        assert_eq!(
            FailureKind::classify(&BackendError::Timeout(Duration::from_secs(1))),
            FailureKind::Other
        );
    }
}
