//! Generator: the Generation Service handle every component is constructed with.
//!
//! Binds a service, a model id and a call policy. Per-call timeout and bounded
//! retry are opt-in; the default policy issues each call exactly once with no
//! deadline. All calls observe the generator's cancellation token.

use crate::error::GenerationError;
use crate::provider::{Contract, GenerationRequest, GenerationService, OutputContract, Payload};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Timeout and retry settings applied to every Generation Service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Option<Duration>,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl CallPolicy {
    const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

#[derive(Clone)]
pub struct Generator {
    service: Arc<dyn GenerationService>,
    model: String,
    policy: CallPolicy,
    cancel: CancellationToken,
}

impl Generator {
    pub fn new(service: Arc<dyn GenerationService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            policy: CallPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Free-text call; the response is trimmed.
    pub async fn text(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = self
            .call(GenerationRequest::text(self.model.as_str(), prompt))
            .await?;
        Ok(payload.into_text().trim().to_string())
    }

    /// Structured call under the type's declared contract
    pub async fn structured<T: Contract>(&self, prompt: &str) -> Result<T, GenerationError> {
        self.structured_with(prompt, T::output_contract()).await
    }

    /// Structured call under a contract built at the call site (e.g. a dynamic enum)
    pub async fn structured_with<T: Contract>(
        &self,
        prompt: &str,
        contract: OutputContract,
    ) -> Result<T, GenerationError> {
        let payload = self
            .call(GenerationRequest::structured(
                self.model.as_str(),
                prompt,
                contract,
            ))
            .await?;
        T::decode(payload)
    }

    /// Issue a request under the call policy
    pub async fn call(&self, request: GenerationRequest) -> Result<Payload, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(
                provider = self.service.provider_name(),
                model = %request.model,
                contract = request.contract.as_ref().map(|c| c.name.as_str()),
                attempt,
                "Generation call"
            );
            match self.attempt(request.clone()).await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Generation call failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(GenerationError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn attempt(&self, request: GenerationRequest) -> Result<Payload, GenerationError> {
        let call = self.service.generate(request);
        let bounded = async {
            match self.policy.timeout {
                Some(after) => match tokio::time::timeout(after, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(GenerationError::Timeout { after }),
                },
                None => call.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(GenerationError::Cancelled),
            outcome = bounded => outcome,
        }
    }
}
