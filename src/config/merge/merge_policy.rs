//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources override earlier ones key by key: defaults, global file,
//! workspace file, environment-specific file, environment variables.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.kind", "gemini")?
        .set_default("provider.model", "gemini-2.0-flash")?
        .set_default("provider.api_key_env", "GEMINI_API_KEY")?
        .set_default("calls.max_attempts", 1)?
        .set_default("calls.backoff_ms", 500)?
        .set_default("refinement.max_iterations", 3)?
        .set_default("refinement.bound", "inclusive")?
        .set_default("aggregation.mode", "lenient")
}
