//! Bounded generate → evaluate → refine loop.
//!
//! Every generation is followed by exactly one evaluation. A `pass` ends the loop
//! in `Passed`; a `fail` feeds its feedback into the next generation until the
//! generation budget derived from `RefinementConfig` is spent, at which point the
//! loop ends in `Exhausted` with the last candidate as best-effort output.
//! Exhaustion is an outcome, not an error.

use crate::error::OrchestrationError;
use crate::provider::{Contract, Generator};
use crate::template::Template;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info, warn};

const GENERATE_PROMPT: &str = "Write a poem about '{{topic}}'.";
const FEEDBACK_SUFFIX: &str = " Consider the following feedback: {{feedback}}";
const EVALUATE_PROMPT: &str = "Critique the following poem. Does it rhyme well? \
Is it exactly four lines?
Is it creative? Respond with PASS or FAIL and provide feedback.

Poem:
{{candidate}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    #[serde(alias = "PASS", alias = "Pass")]
    Pass,
    #[serde(alias = "FAIL", alias = "Fail")]
    Fail,
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationStatus::Pass => write!(f, "pass"),
            EvaluationStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Structured verdict returned by the evaluation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub status: EvaluationStatus,
    pub feedback: String,
    #[serde(default, alias = "response")]
    pub candidate: String,
}

impl EvaluationResult {
    pub fn passed(&self) -> bool {
        self.status == EvaluationStatus::Pass
    }
}

impl Contract for EvaluationResult {
    const NAME: &'static str = "evaluation";

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "enum": ["pass", "fail"] },
                "feedback": { "type": "string" },
                "candidate": { "type": "string" }
            },
            "required": ["status", "feedback"]
        })
    }
}

/// How `max_iterations` bounds the number of generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationBound {
    /// The first generation is free: up to `max_iterations + 1` generations
    #[default]
    Inclusive,
    /// Up to `max_iterations` generations, never fewer than one
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub bound: IterationBound,
}

fn default_max_iterations() -> u32 {
    3
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            bound: IterationBound::default(),
        }
    }
}

impl RefinementConfig {
    /// Maximum generation calls one run may issue
    pub fn max_generations(&self) -> u32 {
        match self.bound {
            IterationBound::Inclusive => self.max_iterations.saturating_add(1),
            IterationBound::Exclusive => self.max_iterations.max(1),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bound == IterationBound::Exclusive && self.max_iterations == 0 {
            return Err("An exclusive bound requires max_iterations >= 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Generating,
    Evaluating,
    Refining,
    Passed,
    Exhausted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Generating => "generating",
            LoopState::Evaluating => "evaluating",
            LoopState::Refining => "refining",
            LoopState::Passed => "passed",
            LoopState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopOutcome {
    Passed,
    Exhausted,
}

/// One generate + evaluate pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationRecord {
    /// 1-based
    pub iteration: u32,
    pub candidate: String,
    pub evaluation: EvaluationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinementOutcome {
    pub outcome: LoopOutcome,
    /// Final candidate: the passing one, or the last generated
    pub artifact: String,
    pub iterations: Vec<IterationRecord>,
}

impl RefinementOutcome {
    pub fn passed(&self) -> bool {
        self.outcome == LoopOutcome::Passed
    }

    /// Generation calls issued (equal to evaluation calls)
    pub fn generations(&self) -> usize {
        self.iterations.len()
    }
}

pub struct RefinementLoop {
    generator: Generator,
    config: RefinementConfig,
    generate: Template,
    feedback: Template,
    evaluate: Template,
}

impl RefinementLoop {
    pub fn new(generator: Generator, config: RefinementConfig) -> Self {
        Self {
            generator,
            config,
            generate: Template::new(GENERATE_PROMPT),
            feedback: Template::new(FEEDBACK_SUFFIX),
            evaluate: Template::new(EVALUATE_PROMPT),
        }
    }

    /// Replace the generation prompt (`{{topic}}`) and the suffix appended
    /// when feedback is present (`{{feedback}}`).
    pub fn with_generation_templates(mut self, generate: Template, feedback: Template) -> Self {
        self.generate = generate;
        self.feedback = feedback;
        self
    }

    /// Replace the evaluation prompt (`{{candidate}}`)
    pub fn with_evaluation_template(mut self, evaluate: Template) -> Self {
        self.evaluate = evaluate;
        self
    }

    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    pub fn generation_prompt(&self, topic: &str, feedback: &str) -> String {
        let mut prompt = self.generate.render(&[("topic", topic)]);
        if !feedback.is_empty() {
            prompt.push_str(&self.feedback.render(&[("feedback", feedback)]));
        }
        prompt
    }

    pub async fn run(&self, topic: &str) -> Result<RefinementOutcome, OrchestrationError> {
        let budget = self.config.max_generations();
        let mut state = LoopState::Generating;
        let mut feedback = String::new();
        let mut candidate = String::new();
        let mut iterations: Vec<IterationRecord> = Vec::new();

        loop {
            debug!(state = %state, iteration = iterations.len() + 1, "Refinement step");
            state = match state {
                LoopState::Generating => {
                    candidate = self
                        .generator
                        .text(&self.generation_prompt(topic, &feedback))
                        .await?;
                    LoopState::Evaluating
                }
                LoopState::Evaluating => {
                    let prompt = self.evaluate.render(&[("candidate", &candidate)]);
                    let evaluation: EvaluationResult = self.generator.structured(&prompt).await?;
                    let passed = evaluation.passed();
                    feedback = evaluation.feedback.clone();
                    iterations.push(IterationRecord {
                        iteration: iterations.len() as u32 + 1,
                        candidate: candidate.clone(),
                        evaluation,
                    });
                    if passed {
                        LoopState::Passed
                    } else if iterations.len() as u32 >= budget {
                        LoopState::Exhausted
                    } else {
                        LoopState::Refining
                    }
                }
                LoopState::Refining => LoopState::Generating,
                LoopState::Passed => {
                    info!(iterations = iterations.len(), "Candidate passed evaluation");
                    return Ok(RefinementOutcome {
                        outcome: LoopOutcome::Passed,
                        artifact: candidate,
                        iterations,
                    });
                }
                LoopState::Exhausted => {
                    warn!(
                        iterations = iterations.len(),
                        max_iterations = self.config.max_iterations,
                        "Iteration budget exhausted, returning last candidate"
                    );
                    return Ok(RefinementOutcome {
                        outcome: LoopOutcome::Exhausted,
                        artifact: candidate,
                        iterations,
                    });
                }
            };
        }
    }
}
