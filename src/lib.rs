//! Conductor: workflow orchestration over a text-generation service
//!
//! Four reusable control-flow primitives built on one `Generator` dependency:
//! parallel fan-out with synthesis, plan-and-delegate execution through a worker
//! registry, a bounded evaluate-refine loop, and classify-then-dispatch routing.

pub mod aggregate;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod execution;
pub mod fanout;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod refine;
pub mod router;
pub mod template;
pub mod worker;

pub use aggregate::{AggregationMode, ResultAggregator};
pub use error::{GenerationError, OrchestrationError};
pub use execution::{ExecutionReport, PlanExecutor};
pub use fanout::FanOutExecutor;
pub use plan::{Plan, Planner, Task};
pub use provider::{CallPolicy, GenerationService, Generator};
pub use refine::{IterationBound, RefinementConfig, RefinementLoop};
pub use router::{Category, HandlerRegistry, Router};
pub use worker::{Worker, WorkerRegistry, WorkerResult};
