//! CLI parse: clap types for Conductor. No behavior; definitions only.

use crate::refine::IterationBound;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_STORY_TOPIC: &str = "a friendly robot exploring a jungle";
pub const DEFAULT_GOAL: &str = "Write a short blog post about the benefits of AI agents.";
pub const DEFAULT_POEM_TOPIC: &str = "a man love a girl";
pub const DEFAULT_QUERY: &str = "What is the weather like in New York today?";

/// Conductor CLI - orchestrate a text-generation service
#[derive(Parser)]
#[command(name = "conductor")]
#[command(
    about = "Fan-out, plan-and-delegate, refinement and routing workflows \
             over a text-generation service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where conductor.toml is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use the scripted offline service instead of the configured provider
    #[arg(long)]
    pub offline: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate story ideas in parallel and synthesize them
    FanOut {
        /// Story topic
        #[arg(default_value = DEFAULT_STORY_TOPIC)]
        topic: String,
    },
    /// Plan a goal, delegate the tasks to workers and combine the results
    Plan {
        /// Goal to plan for
        #[arg(default_value = DEFAULT_GOAL)]
        goal: String,
    },
    /// Generate, evaluate and refine a poem until it passes or the budget runs out
    Refine {
        /// Poem topic
        #[arg(default_value = DEFAULT_POEM_TOPIC)]
        topic: String,
        /// Override refinement.max_iterations
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Override refinement.bound
        #[arg(long, value_enum)]
        bound: Option<BoundArg>,
    },
    /// Classify a query and hand it to the matching category handler
    Route {
        /// Query to route
        #[arg(default_value = DEFAULT_QUERY)]
        query: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BoundArg {
    Inclusive,
    Exclusive,
}

impl From<BoundArg> for IterationBound {
    fn from(arg: BoundArg) -> Self {
        match arg {
            BoundArg::Inclusive => IterationBound::Inclusive,
            BoundArg::Exclusive => IterationBound::Exclusive,
        }
    }
}

impl Commands {
    /// Command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Commands::FanOut { .. } => "fan-out",
            Commands::Plan { .. } => "plan",
            Commands::Refine { .. } => "refine",
            Commands::Route { .. } => "route",
            Commands::Config => "config",
        }
    }
}
