//! Integration tests for the Conductor orchestration engine


mod cli_binary;
mod fan_out;
mod ordering_properties;
mod plan_execution;
mod refinement;
mod routing;
