//! Workspace config file sources: conductor.toml and config/{env}.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::Path;

pub const WORKSPACE_CONFIG_FILE: &str = "conductor.toml";
pub const ENV_VAR: &str = "CONDUCTOR_ENV";

/// Add workspace config files to builder.
/// Precedence: conductor.toml (base) then config/{CONDUCTOR_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env_name = std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string());
    let candidates = [
        workspace_root.join(WORKSPACE_CONFIG_FILE),
        workspace_root
            .join("config")
            .join(format!("{}.toml", env_name)),
    ];

    let mut builder = builder;
    for path in candidates.iter().filter(|path| path.exists()) {
        builder = builder.add_source(
            File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );
    }
    Ok(builder)
}
