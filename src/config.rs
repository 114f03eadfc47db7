//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, the
//! workspace files, then `CONDUCTOR_*` environment overrides. The loaded
//! `ConductorConfig` is validated as a whole so every problem is reported at once.

use crate::aggregate::AggregationConfig;
use crate::logging::LoggingConfig;
use crate::provider::{CallPolicy, ProviderConfig};
use crate::refine::RefinementConfig;
use crate::router::{Category, RouteConfig};
use crate::worker::WorkerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConductorConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub calls: CallConfig,

    #[serde(default)]
    pub refinement: RefinementConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Extra or overriding role workers, keyed by capability tag
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerConfig>,

    /// Extra or overriding router categories
    #[serde(default)]
    pub routes: BTreeMap<String, RouteConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-call timeout and retry (`[calls]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallConfig {
    /// No timeout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl CallConfig {
    pub fn to_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.timeout_secs.map(Duration::from_secs),
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.timeout_secs == Some(0) {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Provider(String),
    Calls(String),
    Refinement(String),
    Worker(String, String),
    Route(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Calls(msg) => write!(f, "Calls: {}", msg),
            ValidationError::Refinement(msg) => write!(f, "Refinement: {}", msg),
            ValidationError::Worker(name, msg) => write!(f, "Worker '{}': {}", name, msg),
            ValidationError::Route(name, msg) => write!(f, "Route '{}': {}", name, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ConductorConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.calls.validate() {
            errors.push(ValidationError::Calls(e));
        }
        if let Err(e) = self.refinement.validate() {
            errors.push(ValidationError::Refinement(e));
        }
        for (tag, worker) in &self.workers {
            if tag.trim().is_empty() {
                errors.push(ValidationError::Worker(
                    tag.clone(),
                    "Capability tag cannot be empty".to_string(),
                ));
            }
            if let Err(e) = worker.validate() {
                errors.push(ValidationError::Worker(tag.clone(), e));
            }
        }
        for (name, route) in &self.routes {
            if Category::new(name.as_str()).is_unknown() {
                errors.push(ValidationError::Route(
                    name.clone(),
                    format!("'{}' is reserved for unclassified queries", Category::UNKNOWN),
                ));
            }
            if let Err(e) = route.validate() {
                errors.push(ValidationError::Route(name.clone(), e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, crate::error::OrchestrationError> {
        toml::to_string_pretty(self).map_err(|e| {
            crate::error::OrchestrationError::Config(format!("Failed to render config: {}", e))
        })
    }
}
