//! Property-based tests for ordering and iteration-bound guarantees

use crate::integration::test_utils::{generator, paused_runtime};
use conductor::provider::stub::{StubReply, StubService};
use conductor::refine::{IterationBound, LoopOutcome};
use conductor::{
    FanOutExecutor, Plan, RefinementConfig, RefinementLoop, ResultAggregator, Task, WorkerResult,
};
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 48,
        ..Config::default()
    })
}

/// Response i belongs to prompt i whatever order the calls finish in
#[test]
fn test_fan_out_order_ignores_completion_order() {
    runner()
        .run(&prop::collection::vec(0u64..500, 1..8), |latencies| {
            let stub = latencies.iter().enumerate().fold(StubService::new(), |stub, (i, ms)| {
                stub.with_rule(
                    format!("[req-{i}]"),
                    StubReply::text(format!("resp-{i}")).after(Duration::from_millis(*ms)),
                )
            });
            let stub = Arc::new(stub);
            let prompts: Vec<String> = (0..latencies.len()).map(|i| format!("[req-{i}]")).collect();

            let responses = paused_runtime().block_on(async {
                FanOutExecutor::new(generator(&stub)).fan_out(&prompts).await
            });
            let expected: Vec<String> = (0..latencies.len()).map(|i| format!("resp-{i}")).collect();
            prop_assert_eq!(responses.unwrap(), expected);
            prop_assert_eq!(stub.call_count(), latencies.len());
            Ok(())
        })
        .unwrap();
}

/// Concatenation follows plan order for any arrival order of results
#[test]
fn test_concatenation_follows_plan_order() {
    let strategy =
        (1usize..7).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle());

    runner()
        .run(&strategy, |arrival| {
            let n = arrival.len();
            let plan = Plan::new(
                "goal",
                (0..n)
                    .map(|i| Task::new(format!("t{i}"), format!("task {i}"), "Writer"))
                    .collect(),
            );
            let results: Vec<WorkerResult> = arrival
                .iter()
                .map(|i| WorkerResult {
                    task_id: format!("t{i}"),
                    worker_tag: "Writer".to_string(),
                    payload: format!("payload {i}"),
                })
                .collect();

            let stub = Arc::new(StubService::new());
            let combined = ResultAggregator::new(generator(&stub))
                .concatenate(&results, &plan)
                .unwrap();
            let expected = (0..n)
                .map(|i| format!("payload {i}"))
                .collect::<Vec<_>>()
                .join("\n\n");
            prop_assert_eq!(combined, expected);
            Ok(())
        })
        .unwrap();
}

/// Generations never exceed the budget, each is evaluated exactly once, and the
/// loop passes exactly when a verdict within the budget passes.
#[test]
fn test_refinement_respects_iteration_bound() {
    let bound = prop_oneof![Just(IterationBound::Inclusive), Just(IterationBound::Exclusive)];
    let strategy = (0u32..5, bound, prop::collection::vec(any::<bool>(), 1..8));

    runner()
        .run(&strategy, |(max_iterations, bound, verdicts)| {
            let replies = verdicts
                .iter()
                .map(|pass| {
                    StubReply::json(json!({
                        "status": if *pass { "pass" } else { "fail" },
                        "feedback": "scripted"
                    }))
                })
                .collect();
            let stub = Arc::new(
                StubService::new()
                    .with_rule("Write a poem", StubReply::text("draft"))
                    .with_sequence("Critique the following", replies),
            );
            let config = RefinementConfig {
                max_iterations,
                bound,
            };
            let budget = config.max_generations() as usize;

            let outcome = paused_runtime()
                .block_on(async {
                    RefinementLoop::new(generator(&stub), config).run("topic").await
                })
                .unwrap();

            // sequences repeat their last reply once exhausted
            let verdict_at = |i: usize| verdicts[i.min(verdicts.len() - 1)];
            let expected = (0..budget).position(verdict_at).map(|i| i + 1).unwrap_or(budget);

            let generations = stub.prompts_matching("Write a poem").len();
            let evaluations = stub.prompts_matching("Critique the following").len();
            prop_assert!(generations <= budget);
            prop_assert_eq!(generations, evaluations);
            prop_assert_eq!(generations, expected);
            prop_assert_eq!(outcome.generations(), generations);
            prop_assert_eq!(
                outcome.outcome == LoopOutcome::Passed,
                (0..budget).any(verdict_at)
            );
            Ok(())
        })
        .unwrap();
}
