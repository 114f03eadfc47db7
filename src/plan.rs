//! Plans: a goal plus an ordered list of capability-tagged tasks.

use crate::error::OrchestrationError;
use crate::provider::{Contract, Generator};
use crate::template::Template;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(alias = "task_id")]
    pub id: String,
    pub description: String,
    /// Capability tag resolved through the worker registry
    #[serde(alias = "assign_to")]
    pub assignee: String,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        assignee: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            assignee: assignee.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub tasks: Vec<Task>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            goal: goal.into(),
            tasks,
        }
    }

    /// Task ids must be non-blank and unique; the plan must have work in it.
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if self.tasks.is_empty() {
            return Err(OrchestrationError::InvalidPlan(
                "plan must contain at least one task".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(OrchestrationError::InvalidPlan(
                    "task id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(OrchestrationError::DuplicateTaskId(task.id.clone()));
            }
        }
        Ok(())
    }
}

impl Contract for Plan {
    const NAME: &'static str = "plan";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal": { "type": "string" },
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "description": { "type": "string" },
                            "assignee": {
                                "type": "string",
                                "description": "Which worker type should handle this task"
                            }
                        },
                        "required": ["id", "description", "assignee"]
                    }
                }
            },
            "required": ["goal", "tasks"]
        })
    }

    fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())
    }
}

const PLANNER_PROMPT: &str = "Create a step-by-step plan to achieve the following goal.
Assign each step to one of these worker types: {{workers}}.
Give every step a short unique id.

Goal: {{goal}}";

/// Issues the planning call that produces a `Plan` for a goal.
pub struct Planner {
    generator: Generator,
    template: Template,
}

impl Planner {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            template: default_planner_template(),
        }
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    pub async fn plan(&self, goal: &str, workers: &[&str]) -> Result<Plan, OrchestrationError> {
        let prompt = self
            .template
            .render(&[("goal", goal), ("workers", &workers.join(", "))]);
        let mut plan: Plan = self.generator.structured(&prompt).await?;
        if plan.goal.trim().is_empty() {
            plan.goal = goal.to_string();
        }
        info!(goal = %plan.goal, tasks = plan.tasks.len(), "Plan created");
        Ok(plan)
    }
}

fn default_planner_template() -> Template {
    Template::new(PLANNER_PROMPT)
}
