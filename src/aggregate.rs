//! Result aggregation: re-order worker output by plan order and synthesize.

use crate::error::OrchestrationError;
use crate::plan::Plan;
use crate::provider::Generator;
use crate::template::Template;
use crate::worker::WorkerResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

const SYNTHESIS_PROMPT: &str = "You are a professional blog writer. \
Based on the following research and writing results, create a cohesive blog post.
{{results}}";

/// Separator between payloads in the concatenation
pub const PAYLOAD_SEPARATOR: &str = "\n\n";

/// What to do when a planned task has no result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Skip the task, logging a warning
    #[default]
    Lenient,
    /// Fail with `MissingResult`
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub mode: AggregationMode,
}

pub struct ResultAggregator {
    generator: Generator,
    mode: AggregationMode,
    template: Template,
}

impl ResultAggregator {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            mode: AggregationMode::default(),
            template: Template::new(SYNTHESIS_PROMPT),
        }
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the synthesis prompt; `{{results}}` receives the concatenation.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Payloads in `plan.tasks` order, joined by a blank line.
    pub fn concatenate(
        &self,
        results: &[WorkerResult],
        plan: &Plan,
    ) -> Result<String, OrchestrationError> {
        let by_id: HashMap<&str, &str> = results
            .iter()
            .map(|result| (result.task_id.as_str(), result.payload.as_str()))
            .collect();

        let mut ordered = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            match by_id.get(task.id.as_str()) {
                Some(payload) => ordered.push(*payload),
                None => match self.mode {
                    AggregationMode::Lenient => {
                        warn!(task_id = %task.id, "No result for planned task, skipping")
                    }
                    AggregationMode::Strict => {
                        return Err(OrchestrationError::MissingResult(task.id.clone()))
                    }
                },
            }
        }
        Ok(ordered.join(PAYLOAD_SEPARATOR))
    }

    /// Concatenate in plan order, then issue one synthesis call
    pub async fn combine(
        &self,
        results: &[WorkerResult],
        plan: &Plan,
    ) -> Result<String, OrchestrationError> {
        let combined = self.concatenate(results, plan)?;
        let prompt = self.template.render(&[("results", &combined)]);
        let output = self.generator.text(&prompt).await?;
        info!(goal = %plan.goal, results = results.len(), "Results combined");
        Ok(output)
    }
}
