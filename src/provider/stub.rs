//! Scripted Generation Service.
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt, falling
//! back to a default reply (echo of the prompt unless configured). Each reply can
//! carry a simulated latency. Every call is recorded, and the stub tracks how many
//! calls ran to completion and the peak number in flight, so tests can observe
//! join-barrier and cancellation behaviour.

use crate::error::GenerationError;
use crate::provider::{GenerationRequest, GenerationService, Payload};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubFailure {
    Transient,
    RateLimited,
    Auth,
}

#[derive(Debug, Clone)]
enum StubOutcome {
    Text(String),
    Json(Value),
    Echo,
    Fail(StubFailure, String),
}

/// One scripted response
#[derive(Debug, Clone)]
pub struct StubReply {
    outcome: StubOutcome,
    latency: Duration,
}

impl StubReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_outcome(StubOutcome::Text(text.into()))
    }

    pub fn json(value: Value) -> Self {
        Self::from_outcome(StubOutcome::Json(value))
    }

    /// Reply with the prompt itself
    pub fn echo() -> Self {
        Self::from_outcome(StubOutcome::Echo)
    }

    pub fn fail_transient(message: impl Into<String>) -> Self {
        Self::fail(StubFailure::Transient, message)
    }

    pub fn fail(kind: StubFailure, message: impl Into<String>) -> Self {
        Self::from_outcome(StubOutcome::Fail(kind, message.into()))
    }

    /// Delay the reply by `latency`
    pub fn after(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn from_outcome(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            latency: Duration::ZERO,
        }
    }

    fn resolve(&self, request: &GenerationRequest) -> Result<Payload, GenerationError> {
        match &self.outcome {
            StubOutcome::Text(text) => Ok(Payload::Text(text.clone())),
            StubOutcome::Json(value) => Ok(Payload::Structured(value.clone())),
            StubOutcome::Echo => Ok(Payload::Text(request.prompt.clone())),
            StubOutcome::Fail(kind, message) => Err(match kind {
                StubFailure::Transient => GenerationError::RequestFailed(message.clone()),
                StubFailure::RateLimited => GenerationError::RateLimited(message.clone()),
                StubFailure::Auth => GenerationError::AuthFailed(message.clone()),
            }),
        }
    }
}

/// A call observed by the stub
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
    pub contract: Option<String>,
}

struct StubRule {
    needle: String,
    replies: Vec<StubReply>,
    cursor: Mutex<usize>,
}

impl StubRule {
    // Sequences advance per match and repeat their last reply once exhausted.
    fn next_reply(&self) -> StubReply {
        let mut cursor = self.cursor.lock();
        let index = (*cursor).min(self.replies.len().saturating_sub(1));
        *cursor += 1;
        self.replies[index].clone()
    }
}

pub struct StubService {
    rules: Vec<StubRule>,
    fallback: StubReply,
    calls: Mutex<Vec<RecordedCall>>,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubService {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: StubReply::echo(),
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reply with `reply` whenever the prompt contains `needle`
    pub fn with_rule(self, needle: impl Into<String>, reply: StubReply) -> Self {
        self.with_sequence(needle, vec![reply])
    }

    /// Reply with successive entries of `replies` on successive matches
    pub fn with_sequence(mut self, needle: impl Into<String>, replies: Vec<StubReply>) -> Self {
        if replies.is_empty() {
            return self;
        }
        self.rules.push(StubRule {
            needle: needle.into(),
            replies,
            cursor: Mutex::new(0),
        });
        self
    }

    pub fn with_fallback(mut self, reply: StubReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Canned responses for running every entry point without a network
    pub fn offline_demo() -> Self {
        Self::new()
            .with_rule(
                "Create a step-by-step plan",
                StubReply::json(json!({
                    "goal": "Write a short blog post about the benefits of AI agents.",
                    "tasks": [
                        {
                            "id": "t1",
                            "description": "Research the main benefits of AI agents",
                            "assignee": "Researcher"
                        },
                        {
                            "id": "t2",
                            "description": "Draft an engaging introduction",
                            "assignee": "Writer"
                        }
                    ]
                })),
            )
            .with_rule(
                "Critique the following",
                StubReply::json(json!({
                    "status": "pass",
                    "feedback": "Rhymes well, four lines, creative.",
                    "candidate": "offline stub candidate"
                })),
            )
            .with_rule(
                "Analyze the user query",
                StubReply::json(json!({
                    "category": "weather",
                    "reasoning": "The query asks about current weather conditions."
                })),
            )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Prompts containing `needle`, in call order
    pub fn prompts_matching(&self, needle: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.prompt.contains(needle))
            .map(|call| call.prompt.clone())
            .collect()
    }

    /// Calls that ran to completion (not dropped mid-flight)
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn reply_for(&self, prompt: &str) -> StubReply {
        self.rules
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
            .map(StubRule::next_reply)
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for StubService {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationService for StubService {
    async fn generate(&self, request: GenerationRequest) -> Result<Payload, GenerationError> {
        self.calls.lock().push(RecordedCall {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            contract: request.contract.as_ref().map(|c| c.name.clone()),
        });
        let reply = self.reply_for(&request.prompt);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !reply.latency.is_zero() {
            tokio::time::sleep(reply.latency).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        reply.resolve(&request)
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}
