//! Fan-out/fan-in synthesis.
//!
//! Issues N independent prompts concurrently, joins on all of them, and folds the
//! responses into one synthesis call. Response `i` always belongs to prompt `i`.

use crate::concurrency::join_ordered;
use crate::error::OrchestrationError;
use crate::provider::Generator;
use crate::template::Template;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

const SYNTHESIS_PROMPT: &str =
    "Combine the following ideas into a single, coherent response:\n{{ideas}}";

/// Outcome of a full fan-out + synthesis run
#[derive(Debug, Clone, Serialize)]
pub struct FanOutReport {
    pub responses: Vec<String>,
    pub synthesis: String,
    /// Wall-clock time of the concurrent phase
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(value.as_millis() as u64)
}

pub struct FanOutExecutor {
    generator: Generator,
    template: Template,
}

impl FanOutExecutor {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            template: Template::new(SYNTHESIS_PROMPT),
        }
    }

    /// Replace the synthesis prompt. `{{ideas}}` receives the labelled responses.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    /// Issue every prompt concurrently; responses align with `prompts`.
    pub async fn fan_out<S: AsRef<str>>(
        &self,
        prompts: &[S],
    ) -> Result<Vec<String>, OrchestrationError> {
        let branches: Vec<_> = prompts
            .iter()
            .map(|prompt| async move {
                self.generator
                    .text(prompt.as_ref())
                    .await
                    .map_err(OrchestrationError::from)
            })
            .collect();

        join_ordered(branches, self.generator.cancellation())
            .await
            .map_err(|failure| {
                failure.into_batch_error(|index| format!("request {}", index), |text| text.clone())
            })
    }

    /// Fold responses into a single prompt and issue one further call.
    pub async fn synthesize<S: AsRef<str>>(
        &self,
        responses: &[S],
    ) -> Result<String, OrchestrationError> {
        let prompt = self.synthesis_prompt(responses);
        Ok(self.generator.text(&prompt).await?)
    }

    pub fn synthesis_prompt<S: AsRef<str>>(&self, responses: &[S]) -> String {
        let ideas = responses
            .iter()
            .enumerate()
            .map(|(i, response)| format!("Idea {}: {}", i + 1, response.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");
        self.template.render(&[("ideas", &ideas)])
    }

    /// Fan out, time the join, then synthesize
    pub async fn run<S: AsRef<str>>(
        &self,
        prompts: &[S],
    ) -> Result<FanOutReport, OrchestrationError> {
        let started = Instant::now();
        let responses = self.fan_out(prompts).await?;
        let elapsed = started.elapsed();
        info!(
            requests = prompts.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Parallel generation completed"
        );
        let synthesis = self.synthesize(&responses).await?;
        Ok(FanOutReport {
            responses,
            synthesis,
            elapsed,
        })
    }
}

/// The three story-idea prompts used by the `fan-out` entry point
pub fn story_prompts(topic: &str) -> Vec<String> {
    ["adventurous", "funny", "mysterious"]
        .iter()
        .map(|tone| format!("Write a short, {} story idea about {}.", tone, topic))
        .collect()
}
