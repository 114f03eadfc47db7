//! Classify-then-dispatch routing.
//!
//! One structured classification call picks a category from the registered set
//! (plus `unknown`), then at most one handler runs. A category with no handler,
//! `unknown` included, is a no-op terminal rather than an error.

use crate::error::{GenerationError, OrchestrationError};
use crate::provider::{Contract, Generator, OutputContract};
use crate::template::Template;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const WEATHER: &str = "weather";
pub const SCIENCE: &str = "science";

/// Placeholders a handler prompt may use
pub const HANDLER_PLACEHOLDERS: &[&str] = &["query"];

const CLASSIFY_PROMPT: &str = "Analyze the user query below and determine its category.
Categories:
{{categories}}

Query: {{query}}";

const WEATHER_PROMPT: &str = "Provide a detailed weather report for the location in the following \
query.

Query: {{query}}";

const SCIENCE_PROMPT: &str = "Provide a detailed explanation of a scientific concept \
related to the following query.

Query: {{query}}";

/// A routing category tag. `unknown` is always a valid classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_lowercase())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured classification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub category: Category,
    pub reasoning: String,
}

impl Contract for RoutingDecision {
    const NAME: &'static str = "routing_decision";

    fn schema() -> Value {
        routing_schema(&[Category::UNKNOWN])
    }
}

fn routing_schema(categories: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": { "type": "string", "enum": categories },
            "reasoning": { "type": "string" }
        },
        "required": ["category", "reasoning"]
    })
}

/// Handler for one routing category
#[async_trait]
pub trait CategoryHandler: Send + Sync {
    /// One-line description listed in the classification prompt
    fn description(&self) -> &str;

    async fn handle(
        &self,
        query: &str,
        generator: &Generator,
    ) -> Result<String, OrchestrationError>;
}

/// Handler that renders a `{{query}}` prompt and issues one free-text call
#[derive(Debug, Clone)]
pub struct PromptHandler {
    description: String,
    template: Template,
}

impl PromptHandler {
    pub fn new(description: impl Into<String>, template: Template) -> Self {
        Self {
            description: description.into(),
            template,
        }
    }

    pub fn from_prompt(
        description: impl Into<String>,
        prompt: &str,
    ) -> Result<Self, OrchestrationError> {
        Ok(Self::new(
            description,
            Template::parse(prompt, HANDLER_PLACEHOLDERS)?,
        ))
    }

    pub fn weather() -> Self {
        Self::new(
            "For questions about weather conditions.",
            Template::new(WEATHER_PROMPT),
        )
    }

    pub fn science() -> Self {
        Self::new("For questions about science.", Template::new(SCIENCE_PROMPT))
    }
}

#[async_trait]
impl CategoryHandler for PromptHandler {
    fn description(&self) -> &str {
        &self.description
    }

    async fn handle(
        &self,
        query: &str,
        generator: &Generator,
    ) -> Result<String, OrchestrationError> {
        let prompt = self.template.render(&[("query", query)]);
        Ok(generator.text(&prompt).await?)
    }
}

/// Config entry for a routing category (`[routes.<name>]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub description: String,
    pub prompt: String,
}

impl RouteConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("Route prompt cannot be empty".to_string());
        }
        Template::parse(&self.prompt, HANDLER_PLACEHOLDERS)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Category to handler bindings
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Category, Arc<dyn CategoryHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in weather and science handlers
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(Category::new(WEATHER), Arc::new(PromptHandler::weather()));
        registry.register(Category::new(SCIENCE), Arc::new(PromptHandler::science()));
        registry
    }

    /// Bind a handler, replacing any existing binding
    pub fn register(&mut self, category: Category, handler: Arc<dyn CategoryHandler>) {
        if self.handlers.insert(category.clone(), handler).is_some() {
            debug!(category = %category, "Replaced category handler");
        }
    }

    pub fn get(&self, category: &Category) -> Option<&Arc<dyn CategoryHandler>> {
        self.handlers.get(category)
    }

    pub fn resolve(
        &self,
        category: &Category,
    ) -> Result<Arc<dyn CategoryHandler>, OrchestrationError> {
        self.get(category)
            .cloned()
            .ok_or_else(|| OrchestrationError::UnknownCategoryHandler(category.to_string()))
    }

    /// Registered categories, sorted
    pub fn categories(&self) -> Vec<&Category> {
        let mut categories: Vec<&Category> = self.handlers.keys().collect();
        categories.sort();
        categories
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Register prompt handlers declared under `[routes.*]`
    pub fn load_from_config<'a, I>(&mut self, routes: I) -> Result<(), OrchestrationError>
    where
        I: IntoIterator<Item = (&'a String, &'a RouteConfig)>,
    {
        for (name, route) in routes {
            let category = Category::new(name.as_str());
            if category.is_unknown() {
                return Err(OrchestrationError::Config(format!(
                    "'{}' is reserved and cannot have a handler",
                    Category::UNKNOWN
                )));
            }
            let handler = PromptHandler::from_prompt(route.description.clone(), &route.prompt)?;
            self.register(category, Arc::new(handler));
        }
        Ok(())
    }
}

/// Result of one routed query
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub decision: RoutingDecision,
    /// Handler output; `None` when no handler is bound to the category
    pub output: Option<String>,
}

pub struct Router {
    generator: Generator,
    handlers: HandlerRegistry,
    template: Template,
}

impl Router {
    pub fn new(generator: Generator, handlers: HandlerRegistry) -> Self {
        Self {
            generator,
            handlers,
            template: Template::new(CLASSIFY_PROMPT),
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Classification prompt listing every registered category plus `unknown`
    pub fn classification_prompt(&self, query: &str) -> String {
        let mut lines: Vec<String> = self
            .handlers
            .categories()
            .into_iter()
            .filter_map(|category| {
                self.handlers
                    .get(category)
                    .map(|handler| format!("- {}: {}", category, handler.description()))
            })
            .collect();
        lines.push(format!(
            "- {}: If the category is unclear.",
            Category::UNKNOWN
        ));
        self.template
            .render(&[("categories", &lines.join("\n")), ("query", query)])
    }

    /// Contract whose category enum is exactly the registered set plus `unknown`
    pub fn classification_contract(&self) -> OutputContract {
        let mut allowed: Vec<&str> = self
            .handlers
            .categories()
            .into_iter()
            .map(Category::as_str)
            .collect();
        allowed.push(Category::UNKNOWN);
        OutputContract::new(RoutingDecision::NAME, routing_schema(&allowed))
    }

    /// Single structured call; a category outside the allowed set is a schema violation.
    pub async fn classify(&self, query: &str) -> Result<RoutingDecision, OrchestrationError> {
        let prompt = self.classification_prompt(query);
        let mut decision: RoutingDecision = self
            .generator
            .structured_with(&prompt, self.classification_contract())
            .await?;
        decision.category = Category::new(decision.category.as_str());

        if !decision.category.is_unknown() && self.handlers.get(&decision.category).is_none() {
            return Err(GenerationError::SchemaValidation {
                contract: RoutingDecision::NAME.to_string(),
                message: format!("category '{}' is not a registered category", decision.category),
            }
            .into());
        }
        info!(category = %decision.category, "Query classified");
        Ok(decision)
    }

    /// Invoke the category's handler, or nothing when none is bound.
    pub async fn dispatch(
        &self,
        category: &Category,
        query: &str,
    ) -> Result<Option<String>, OrchestrationError> {
        let handler = match self.handlers.resolve(category) {
            Ok(handler) => handler,
            Err(OrchestrationError::UnknownCategoryHandler(_)) => {
                info!(category = %category, "No handler for category, no action taken");
                return Ok(None);
            }
            Err(other) => return Err(other),
        };
        debug!(category = %category, "Dispatching to category handler");
        handler.handle(query, &self.generator).await.map(Some)
    }

    pub async fn route(&self, query: &str) -> Result<RouteOutcome, OrchestrationError> {
        let decision = self.classify(query).await?;
        let output = self.dispatch(&decision.category, query).await?;
        Ok(RouteOutcome { decision, output })
    }
}
