//! Plan executor: resolves every task's worker, then dispatches all tasks concurrently.
//! Owns pre-flight validation and the join barrier; prompts stay with the workers.

use crate::concurrency::join_ordered;
use crate::error::OrchestrationError;
use crate::plan::Plan;
use crate::provider::Generator;
use crate::worker::{WorkerRegistry, WorkerResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Raw per-task results of one plan execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub goal: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub results: Vec<WorkerResult>,
}

/// Executes a plan by resolving workers through the registry and joining on all tasks.
pub struct PlanExecutor {
    registry: Arc<WorkerRegistry>,
    generator: Generator,
}

impl PlanExecutor {
    pub fn new(registry: Arc<WorkerRegistry>, generator: Generator) -> Self {
        Self {
            registry,
            generator,
        }
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Execute every task; results come back in plan order.
    ///
    /// Validation and worker resolution happen before any call is dispatched, so an
    /// unknown assignee fails with `UnknownWorker` having issued nothing.
    pub async fn execute(&self, plan: &Plan) -> Result<Vec<WorkerResult>, OrchestrationError> {
        plan.validate()?;
        let workers = self.registry.resolve_plan(plan)?;

        let branches: Vec<_> = plan
            .tasks
            .iter()
            .zip(workers)
            .map(|(task, worker)| {
                debug!(task_id = %task.id, assignee = %task.assignee, "Dispatching task");
                let generator = &self.generator;
                let goal = plan.goal.as_str();
                async move { worker.run(task, goal, generator).await }
            })
            .collect();

        join_ordered(branches, self.generator.cancellation())
            .await
            .map_err(|failure| {
                failure.into_batch_error(
                    |index| {
                        plan.tasks
                            .get(index)
                            .map(|task| task.id.clone())
                            .unwrap_or_else(|| format!("task {}", index))
                    },
                    |result| result.payload.clone(),
                )
            })
    }

    /// Execute and wrap the results with timing for reporting
    pub async fn run(&self, plan: &Plan) -> Result<ExecutionReport, OrchestrationError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let results = self.execute(plan).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            goal = %plan.goal,
            tasks = results.len(),
            elapsed_ms,
            "All tasks completed"
        );
        Ok(ExecutionReport {
            goal: plan.goal.clone(),
            started_at,
            elapsed_ms,
            results,
        })
    }
}
