//! Workers
//!
//! A worker turns one planned task into a result through the Generation Service.
//! Workers are bound to capability tags in the `WorkerRegistry`; the built-in
//! capability set is `Researcher`, `Writer` and `Coder`, each a `RoleWorker`
//! with its own prompt template.

use crate::error::OrchestrationError;
use crate::plan::Task;
use crate::provider::Generator;
use crate::template::Template;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod registry;

pub use registry::WorkerRegistry;

pub const RESEARCHER: &str = "Researcher";
pub const WRITER: &str = "Writer";
pub const CODER: &str = "Coder";

/// Placeholders a worker prompt may use
pub const WORKER_PLACEHOLDERS: &[&str] = &["task", "goal", "task_id"];

const RESEARCHER_PROMPT: &str = "You are a professional researcher. \
Complete the following research task:

Task: {{task}}

Provide thorough, factual information with proper citations where relevant.";

const WRITER_PROMPT: &str = "You are a professional writer. Complete the following writing task:

Task: {{task}}

Write in a clear, engaging style appropriate for a blog post.";

const CODER_PROMPT: &str = "You are a professional programmer. Complete the following coding task:

Task: {{task}}

Provide clean, well-commented code with explanations.";

/// Output of one dispatched task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub task_id: String,
    pub worker_tag: String,
    pub payload: String,
}

/// A capability implementation
#[async_trait]
pub trait Worker: Send + Sync {
    /// Capability tag this worker was built for
    fn tag(&self) -> &str;

    async fn run(
        &self,
        task: &Task,
        goal: &str,
        generator: &Generator,
    ) -> Result<WorkerResult, OrchestrationError>;
}

/// Worker that renders a role-specific prompt and issues one free-text call
#[derive(Debug, Clone)]
pub struct RoleWorker {
    tag: String,
    template: Template,
}

impl RoleWorker {
    pub fn new(tag: impl Into<String>, template: Template) -> Self {
        Self {
            tag: tag.into(),
            template,
        }
    }

    /// Build from a user-supplied prompt, validating its placeholders
    pub fn from_prompt(tag: impl Into<String>, prompt: &str) -> Result<Self, OrchestrationError> {
        Ok(Self::new(tag, Template::parse(prompt, WORKER_PLACEHOLDERS)?))
    }

    pub fn researcher() -> Self {
        Self::new(RESEARCHER, Template::new(RESEARCHER_PROMPT))
    }

    pub fn writer() -> Self {
        Self::new(WRITER, Template::new(WRITER_PROMPT))
    }

    pub fn coder() -> Self {
        Self::new(CODER, Template::new(CODER_PROMPT))
    }

    pub fn render(&self, task: &Task, goal: &str) -> String {
        self.template.render(&[
            ("task", task.description.as_str()),
            ("goal", goal),
            ("task_id", task.id.as_str()),
        ])
    }
}

#[async_trait]
impl Worker for RoleWorker {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn run(
        &self,
        task: &Task,
        goal: &str,
        generator: &Generator,
    ) -> Result<WorkerResult, OrchestrationError> {
        debug!(task_id = %task.id, worker = %self.tag, "Executing task");
        let payload = generator.text(&self.render(task, goal)).await?;
        Ok(WorkerResult {
            task_id: task.id.clone(),
            worker_tag: self.tag.clone(),
            payload,
        })
    }
}

/// Config entry for an additional role worker (`[workers.<Tag>]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub prompt: String,
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("Worker prompt cannot be empty".to_string());
        }
        Template::parse(&self.prompt, WORKER_PLACEHOLDERS)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
