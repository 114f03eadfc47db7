//! Evaluator-optimizer loop against scripted generations and verdicts.

use crate::integration::test_utils::{generator, paused_runtime};
use conductor::provider::stub::{StubReply, StubService};
use conductor::refine::{IterationBound, LoopOutcome};
use conductor::template::Template;
use conductor::{GenerationError, OrchestrationError, RefinementConfig, RefinementLoop};
use serde_json::json;
use std::sync::Arc;

fn verdict(status: &str, feedback: &str) -> StubReply {
    StubReply::json(json!({ "status": status, "feedback": feedback }))
}

fn poem_stub(evaluations: Vec<StubReply>) -> Arc<StubService> {
    Arc::new(
        StubService::new()
            .with_sequence(
                "Write a poem",
                (1..=6).map(|n| StubReply::text(format!("draft {n}"))).collect(),
            )
            .with_sequence("Critique the following", evaluations),
    )
}

#[test]
fn test_fail_then_pass_threads_feedback_into_next_generation() {
    paused_runtime().block_on(async {
        let stub = poem_stub(vec![
            verdict("fail", "The second line does not rhyme."),
            verdict("pass", "Good."),
        ]);
        let outcome = RefinementLoop::new(generator(&stub), RefinementConfig::default())
            .run("the sea")
            .await
            .unwrap();

        assert_eq!(outcome.outcome, LoopOutcome::Passed);
        assert_eq!(outcome.artifact, "draft 2");
        assert_eq!(outcome.generations(), 2);

        let generations = stub.prompts_matching("Write a poem");
        assert_eq!(generations[0], "Write a poem about 'the sea'.");
        assert_eq!(
            generations[1],
            "Write a poem about 'the sea'. Consider the following feedback: \
             The second line does not rhyme."
        );
        let evaluations = stub.prompts_matching("Critique the following");
        assert!(evaluations[1].ends_with("Poem:\ndraft 2"));
    });
}

#[test]
fn test_persistent_failure_exhausts_with_last_candidate() {
    paused_runtime().block_on(async {
        let stub = poem_stub(vec![verdict("FAIL", "Still too long.")]);
        let config = RefinementConfig {
            max_iterations: 2,
            bound: IterationBound::Inclusive,
        };
        let outcome = RefinementLoop::new(generator(&stub), config)
            .run("autumn")
            .await
            .unwrap();

        assert_eq!(outcome.outcome, LoopOutcome::Exhausted);
        assert!(!outcome.passed());
        assert_eq!(outcome.artifact, "draft 3");
        let numbers: Vec<u32> = outcome.iterations.iter().map(|r| r.iteration).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(outcome.iterations.iter().all(|r| !r.evaluation.passed()));
        assert_eq!(stub.call_count(), 6);
    });
}

#[test]
fn test_zero_iterations_inclusive_still_generates_once() {
    paused_runtime().block_on(async {
        let stub = poem_stub(vec![verdict("fail", "no")]);
        let config = RefinementConfig {
            max_iterations: 0,
            bound: IterationBound::Inclusive,
        };
        let outcome = RefinementLoop::new(generator(&stub), config)
            .run("snow")
            .await
            .unwrap();
        assert_eq!(outcome.outcome, LoopOutcome::Exhausted);
        assert_eq!(outcome.generations(), 1);
        assert_eq!(outcome.artifact, "draft 1");
    });
}

#[test]
fn test_generation_failure_propagates() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_sequence(
                    "Write a poem",
                    vec![StubReply::text("draft 1"), StubReply::fail_transient("backend down")],
                )
                .with_rule("Critique the following", verdict("fail", "again")),
        );
        let err = RefinementLoop::new(generator(&stub), RefinementConfig::default())
            .run("rain")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Generation(GenerationError::RequestFailed(_))
        ));
    });
}

#[test]
fn test_custom_templates_drive_a_different_artifact() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_rule("Draft a haiku", StubReply::text("old pond"))
                .with_rule("Grade this haiku", verdict("pass", "Lovely.")),
        );
        let refiner = RefinementLoop::new(generator(&stub), RefinementConfig::default())
            .with_generation_templates(
                Template::parse("Draft a haiku on {{topic}}.", &["topic"]).unwrap(),
                Template::parse(" Fix: {{feedback}}", &["feedback"]).unwrap(),
            )
            .with_evaluation_template(
                Template::parse("Grade this haiku:\n{{candidate}}", &["candidate"]).unwrap(),
            );

        let outcome = refiner.run("frogs").await.unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.artifact, "old pond");
        assert_eq!(stub.prompts_matching("Grade this haiku"), vec!["Grade this haiku:\nold pond"]);
    });
}
