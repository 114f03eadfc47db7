//! Worker registry: capability tag to worker bindings.

use crate::config::ConductorConfig;
use crate::error::OrchestrationError;
use crate::plan::Plan;
use crate::worker::{RoleWorker, Worker};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Worker registry resolving capability tags at dispatch time.
///
/// Tags match case-insensitively; each binding keeps the spelling it was first
/// registered under, which is what `tags` reports to the planner.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Binding>,
}

#[derive(Clone)]
struct Binding {
    tag: String,
    worker: Arc<dyn Worker>,
}

fn normalize(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

impl WorkerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Researcher, Writer and Coder workers
    pub fn with_default_workers() -> Self {
        let mut registry = Self::new();
        for worker in [
            RoleWorker::researcher(),
            RoleWorker::writer(),
            RoleWorker::coder(),
        ] {
            let tag = worker.tag().to_string();
            registry.register(tag, Arc::new(worker));
        }
        registry
    }

    /// Bind `tag` to `worker`, replacing any existing binding under any casing
    pub fn register(&mut self, tag: impl Into<String>, worker: Arc<dyn Worker>) {
        let tag = tag.into();
        let key = normalize(&tag);
        match self.workers.get_mut(&key) {
            Some(binding) => {
                binding.worker = worker;
                debug!(tag = %binding.tag, "Replaced worker binding");
            }
            None => {
                let tag = tag.trim().to_string();
                self.workers.insert(key, Binding { tag, worker });
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Worker>> {
        self.workers.get(&normalize(tag)).map(|binding| &binding.worker)
    }

    /// Resolve a tag or fail with `UnknownWorker`
    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn Worker>, OrchestrationError> {
        self.get(tag)
            .cloned()
            .ok_or_else(|| OrchestrationError::UnknownWorker(tag.to_string()))
    }

    /// Resolve every task's assignee, in task order, before any work starts.
    ///
    /// All-or-nothing: the first unresolvable assignee fails the whole plan.
    pub fn resolve_plan(&self, plan: &Plan) -> Result<Vec<Arc<dyn Worker>>, OrchestrationError> {
        plan.tasks
            .iter()
            .map(|task| self.resolve(&task.assignee))
            .collect()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.workers.contains_key(&normalize(tag))
    }

    /// Registered tags as first spelled, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .workers
            .values()
            .map(|binding| binding.tag.as_str())
            .collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Register role workers declared under `[workers.*]`.
    ///
    /// Config keys arrive lower-cased, so an entry that overrides an existing
    /// capability takes over that capability's spelling.
    pub fn load_from_config(&mut self, config: &ConductorConfig) -> Result<(), OrchestrationError> {
        for (key, worker_config) in &config.workers {
            let tag = self
                .workers
                .get(&normalize(key))
                .map(|binding| binding.tag.clone())
                .unwrap_or_else(|| key.trim().to_string());
            let worker = RoleWorker::from_prompt(tag.clone(), &worker_config.prompt)?;
            self.register(tag, Arc::new(worker));
        }
        Ok(())
    }
}
