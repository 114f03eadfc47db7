//! CLI domain: parse, route, output, and presentation only.
//! No orchestration logic; a single route table dispatches to the engine components.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{BoundArg, Cli, Commands};
pub use presentation::{
    format_fan_out, format_plan, format_refinement, format_route, format_section_heading,
};
pub use route::{load_config, RunContext};
