//! Classify-then-dispatch routing against a scripted classifier.

use crate::integration::test_utils::{generator, paused_runtime};
use async_trait::async_trait;
use conductor::provider::stub::{StubReply, StubService};
use conductor::router::{CategoryHandler, RouteConfig};
use conductor::{Category, GenerationError, Generator, HandlerRegistry, OrchestrationError, Router};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn classifier(category: &str) -> Arc<StubService> {
    Arc::new(
        StubService::new()
            .with_rule(
                "Analyze the user query",
                StubReply::json(json!({ "category": category, "reasoning": "scripted" })),
            )
            .with_rule("weather report", StubReply::text("Sunny, 24C"))
            .with_rule("scientific concept", StubReply::text("Photosynthesis explained")),
    )
}

#[test]
fn test_weather_query_dispatches_exactly_one_handler() {
    paused_runtime().block_on(async {
        let stub = classifier("weather");
        let router = Router::new(generator(&stub), HandlerRegistry::with_default_handlers());

        let outcome = router.route("What's the weather like in London?").await.unwrap();
        assert_eq!(outcome.decision.category, Category::new("weather"));
        assert_eq!(outcome.output.as_deref(), Some("Sunny, 24C"));
        assert_eq!(stub.call_count(), 2);
        assert!(stub.prompts_matching("scientific concept").is_empty());

        let handler_prompt = &stub.prompts_matching("weather report")[0];
        assert!(handler_prompt.ends_with("Query: What's the weather like in London?"));
    });
}

#[test]
fn test_unknown_category_runs_no_handler() {
    paused_runtime().block_on(async {
        let stub = classifier("unknown");
        let router = Router::new(generator(&stub), HandlerRegistry::with_default_handlers());

        let outcome = router.route("Tell me a joke").await.unwrap();
        assert!(outcome.decision.category.is_unknown());
        assert!(outcome.output.is_none());
        assert_eq!(stub.call_count(), 1);
    });
}

#[test]
fn test_category_outside_registered_set_is_rejected() {
    paused_runtime().block_on(async {
        let stub = classifier("sports");
        let router = Router::new(generator(&stub), HandlerRegistry::with_default_handlers());

        let err = router.route("Who won the match?").await.unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Generation(GenerationError::SchemaValidation { .. })
        ));
        assert_eq!(stub.call_count(), 1);
    });
}

#[test]
fn test_classifier_casing_is_normalized() {
    paused_runtime().block_on(async {
        let stub = classifier(" Science ");
        let router = Router::new(generator(&stub), HandlerRegistry::with_default_handlers());

        let outcome = router.route("Why is the sky blue?").await.unwrap();
        assert_eq!(outcome.decision.category.as_str(), "science");
        assert_eq!(outcome.output.as_deref(), Some("Photosynthesis explained"));
    });
}

struct CountingHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl CategoryHandler for CountingHandler {
    fn description(&self) -> &str {
        "For questions about invoices."
    }

    async fn handle(
        &self,
        query: &str,
        _generator: &Generator,
    ) -> Result<String, OrchestrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("billing: {query}"))
    }
}

#[test]
fn test_registered_handlers_extend_the_classification_set() {
    paused_runtime().block_on(async {
        let stub = classifier("billing");
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        let mut handlers = HandlerRegistry::with_default_handlers();
        handlers.register(Category::new("billing"), handler.clone());
        let router = Router::new(generator(&stub), handlers);

        let prompt = router.classification_prompt("Where is my invoice?");
        assert!(prompt.contains("- billing: For questions about invoices."));
        assert!(prompt.contains("- unknown: If the category is unclear."));

        let outcome = router.route("Where is my invoice?").await.unwrap();
        assert_eq!(outcome.output.as_deref(), Some("billing: Where is my invoice?"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        // the handler issued no generation call of its own
        assert_eq!(stub.call_count(), 1);
    });
}

#[test]
fn test_configured_routes_register_prompt_handlers() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_rule(
                    "Analyze the user query",
                    StubReply::json(json!({ "category": "history", "reasoning": "dates" })),
                )
                .with_rule("historian", StubReply::text("It was 1066.")),
        );
        let mut routes = BTreeMap::new();
        routes.insert(
            "history".to_string(),
            RouteConfig {
                description: "For questions about past events.".to_string(),
                prompt: "Answer as a historian: {{query}}".to_string(),
            },
        );
        let mut handlers = HandlerRegistry::with_default_handlers();
        handlers.load_from_config(&routes).unwrap();
        assert_eq!(handlers.len(), 3);

        let router = Router::new(generator(&stub), handlers);
        let outcome = router.route("When was Hastings?").await.unwrap();
        assert_eq!(outcome.output.as_deref(), Some("It was 1066."));
        assert_eq!(
            stub.prompts_matching("historian"),
            vec!["Answer as a historian: When was Hastings?"]
        );
    });
}
