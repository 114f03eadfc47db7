//! Error types for the orchestration engine.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failures at the Generation Service boundary
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider model not found: {0}")]
    ModelNotFound(String),

    #[error("Generation call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Response does not satisfy output contract '{contract}': {message}")]
    SchemaValidation { contract: String, message: String },

    #[error("Generation call cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Transient failures that a retry policy may re-issue.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RequestFailed(_)
                | GenerationError::RateLimited(_)
                | GenerationError::Timeout { .. }
        )
    }
}

/// A sibling result that completed before its batch was aborted.
///
/// Carried for diagnostics only; a failed batch never yields these as output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialResult {
    pub index: usize,
    pub label: String,
    pub payload: String,
}

/// Engine-level errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("No worker registered for capability: {0}")]
    UnknownWorker(String),

    #[error("No handler registered for category: {0}")]
    UnknownCategoryHandler(String),

    #[error("Duplicate task id in plan: {0}")]
    DuplicateTaskId(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("No result produced for planned task: {0}")]
    MissingResult(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(
        "Batch aborted at {label} (index {index}, {} sibling(s) had completed): {source}",
        .partial.len()
    )]
    BatchFailed {
        index: usize,
        label: String,
        partial: Vec<PartialResult>,
        #[source]
        source: Box<OrchestrationError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrchestrationError {
    /// The underlying failure with any batch wrappers removed.
    pub fn root_cause(&self) -> &OrchestrationError {
        match self {
            OrchestrationError::BatchFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Partial results attached to a failed batch, empty for every other error.
    pub fn partial_results(&self) -> &[PartialResult] {
        match self {
            OrchestrationError::BatchFailed { partial, .. } => partial,
            _ => &[],
        }
    }
}

impl From<config::ConfigError> for OrchestrationError {
    fn from(err: config::ConfigError) -> Self {
        OrchestrationError::Config(err.to_string())
    }
}
