//! Config loader facade: assembles the layered sources into a `ConductorConfig`.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::ConductorConfig;
use crate::error::OrchestrationError;
use config::{File, FileFormat};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with full precedence: defaults, global file, workspace files, environment.
    pub fn load(workspace_root: &Path) -> Result<ConductorConfig, OrchestrationError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: ConductorConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load an explicit file (must exist) over the defaults; environment still applies.
    pub fn load_from_file(path: &Path) -> Result<ConductorConfig, OrchestrationError> {
        if !path.exists() {
            return Err(OrchestrationError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true));
        let builder = environment::add_to_builder(builder);

        let config: ConductorConfig = builder.build()?.try_deserialize()?;
        debug!(config_path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }
}
