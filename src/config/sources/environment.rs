//! Environment source: CONDUCTOR_<SECTION>__<KEY>, e.g. CONDUCTOR_PROVIDER__MODEL

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub const PREFIX: &str = "CONDUCTOR";
pub const SEPARATOR: &str = "__";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator("_")
            .separator(SEPARATOR)
            .try_parsing(true),
    )
}
