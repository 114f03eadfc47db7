//! Fan-out/fan-in synthesis against a scripted service.

use crate::integration::test_utils::{generator, paused_runtime};
use conductor::fanout::story_prompts;
use conductor::provider::stub::{StubReply, StubService};
use conductor::provider::CallPolicy;
use conductor::{FanOutExecutor, GenerationError, OrchestrationError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[test]
fn test_story_ideas_are_generated_concurrently_and_synthesized() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_rule(
                    "adventurous",
                    StubReply::text("A quest").after(Duration::from_millis(300)),
                )
                .with_rule("funny", StubReply::text("A pratfall").after(Duration::from_millis(100)))
                .with_rule(
                    "mysterious",
                    StubReply::text("A riddle").after(Duration::from_millis(200)),
                )
                .with_rule("Combine the following ideas", StubReply::text("One story")),
        );
        let executor = FanOutExecutor::new(generator(&stub));

        let report = executor.run(&story_prompts("a robot")).await.unwrap();
        assert_eq!(report.responses, vec!["A quest", "A pratfall", "A riddle"]);
        assert_eq!(report.synthesis, "One story");
        // the join waits for the slowest sibling, not the sum of all three
        assert!(report.elapsed >= Duration::from_millis(300));
        assert!(report.elapsed < Duration::from_millis(600));
        assert_eq!(stub.peak_in_flight(), 3);

        let synthesis = stub.prompts_matching("Combine the following ideas");
        assert_eq!(
            synthesis[0],
            "Combine the following ideas into a single, coherent response:\n\
             Idea 1: A quest\nIdea 2: A pratfall\nIdea 3: A riddle"
        );
    });
}

#[test]
fn test_timeout_policy_fails_the_fan_out() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_rule("slow", StubReply::text("late").after(Duration::from_secs(120)))
                .with_fallback(StubReply::text("quick")),
        );
        let executor = FanOutExecutor::new(generator(&stub).with_policy(CallPolicy {
            timeout: Some(Duration::from_secs(30)),
            ..CallPolicy::default()
        }));

        let err = executor.fan_out(&["fast", "slow"]).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            OrchestrationError::Generation(GenerationError::Timeout { .. })
        ));
        assert_eq!(err.partial_results().len(), 1);
    });
}

#[test]
fn test_retry_policy_recovers_transient_failures() {
    paused_runtime().block_on(async {
        let stub = Arc::new(StubService::new().with_sequence(
            "flaky",
            vec![StubReply::fail_transient("503"), StubReply::text("ok")],
        ));
        let executor = FanOutExecutor::new(generator(&stub).with_policy(CallPolicy {
            timeout: None,
            max_attempts: 2,
            backoff: Duration::from_millis(100),
        }));

        let responses = executor.fan_out(&["flaky one", "steady"]).await.unwrap();
        assert_eq!(responses, vec!["ok", "steady"]);
        assert_eq!(stub.call_count(), 3);
    });
}

#[test]
fn test_cancellation_aborts_in_flight_requests() {
    paused_runtime().block_on(async {
        let stub = Arc::new(StubService::new().with_fallback(
            StubReply::text("never").after(Duration::from_secs(10)),
        ));
        let cancel = CancellationToken::new();
        let executor = FanOutExecutor::new(generator(&stub).with_cancellation(cancel.clone()));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = executor.fan_out(&["a", "b", "c"]).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            OrchestrationError::Generation(GenerationError::Cancelled)
        ));
        assert_eq!(stub.completed_count(), 0);
    });
}
