//! Plan-and-delegate: planner, executor and aggregator against a scripted service.

use crate::integration::test_utils::{generator, paused_runtime};
use async_trait::async_trait;
use conductor::provider::stub::{StubReply, StubService};
use conductor::template::Template;
use conductor::worker::{RESEARCHER, WRITER};
use conductor::{
    AggregationMode, Generator, OrchestrationError, Plan, PlanExecutor, Planner,
    ResultAggregator, Task, Worker, WorkerRegistry, WorkerResult,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn blog_plan() -> Plan {
    Plan::new(
        "X",
        vec![
            Task::new("t1", "Research agent benefits", RESEARCHER),
            Task::new("t2", "Write the introduction", WRITER),
        ],
    )
}

fn scripted_roles() -> Arc<StubService> {
    Arc::new(
        StubService::new()
            .with_rule(
                "professional researcher",
                StubReply::text("R1").after(Duration::from_millis(50)),
            )
            .with_rule(
                "professional writer",
                StubReply::text("W1").after(Duration::from_millis(10)),
            ),
    )
}

#[test]
fn test_researcher_writer_plan_combines_in_plan_order() {
    paused_runtime().block_on(async {
        let stub = scripted_roles();
        let executor = PlanExecutor::new(
            Arc::new(WorkerRegistry::with_default_workers()),
            generator(&stub),
        );
        let plan = blog_plan();

        let results = executor.execute(&plan).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].payload, "R1");
        assert_eq!(results[1].payload, "W1");

        // completion order was W1 then R1; aggregation follows plan order
        let mut reversed = results.clone();
        reversed.reverse();
        let aggregator = ResultAggregator::new(generator(&stub))
            .with_template(Template::new("{{results}}"));
        assert_eq!(aggregator.concatenate(&reversed, &plan).unwrap(), "R1\n\nW1");
        assert_eq!(aggregator.combine(&reversed, &plan).await.unwrap(), "R1\n\nW1");
    });
}

#[test]
fn test_unknown_assignee_returns_no_results() {
    paused_runtime().block_on(async {
        let stub = scripted_roles();
        let executor = PlanExecutor::new(
            Arc::new(WorkerRegistry::with_default_workers()),
            generator(&stub),
        );
        let mut plan = blog_plan();
        plan.tasks.push(Task::new("t3", "Draw a diagram", "Illustrator"));

        let err = executor.execute(&plan).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::UnknownWorker(ref tag) if tag == "Illustrator"));
        assert!(err.partial_results().is_empty());
        assert_eq!(stub.call_count(), 0);
    });
}

#[test]
fn test_planner_to_synthesis_pipeline() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_rule(
                    "Create a step-by-step plan",
                    StubReply::json(json!({
                        "goal": "Explain agents",
                        "tasks": [
                            {
                                "id": "research",
                                "description": "Find facts",
                                "assignee": "Researcher"
                            },
                            {"id": "draft", "description": "Write it", "assignee": "Writer"},
                            {"id": "demo", "description": "Show code", "assignee": "Coder"}
                        ]
                    })),
                )
                .with_rule("professional researcher", StubReply::text("facts"))
                .with_rule("professional writer", StubReply::text("prose"))
                .with_rule("professional programmer", StubReply::text("code"))
                .with_rule("professional blog writer", StubReply::text("Final post")),
        );
        let registry = Arc::new(WorkerRegistry::with_default_workers());

        let plan = Planner::new(generator(&stub))
            .plan("Explain agents", &registry.tags())
            .await
            .unwrap();
        let report = PlanExecutor::new(registry, generator(&stub))
            .run(&plan)
            .await
            .unwrap();
        let ids: Vec<&str> = report.results.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["research", "draft", "demo"]);

        let aggregator = ResultAggregator::new(generator(&stub));
        let final_text = aggregator.combine(&report.results, &plan).await.unwrap();
        assert_eq!(final_text, "Final post");

        let synthesis = stub.prompts_matching("professional blog writer");
        assert_eq!(synthesis.len(), 1);
        assert!(synthesis[0].ends_with("facts\n\nprose\n\ncode"));
        // planning + three workers + synthesis
        assert_eq!(stub.call_count(), 5);
    });
}

#[test]
fn test_failed_task_aborts_batch_with_diagnostics() {
    paused_runtime().block_on(async {
        let stub = Arc::new(
            StubService::new()
                .with_rule("professional researcher", StubReply::text("R1"))
                .with_rule(
                    "professional writer",
                    StubReply::fail_transient("backend unavailable")
                        .after(Duration::from_millis(20)),
                ),
        );
        let executor = PlanExecutor::new(
            Arc::new(WorkerRegistry::with_default_workers()),
            generator(&stub),
        );

        let err = executor.execute(&blog_plan()).await.unwrap_err();
        let partial = err.partial_results();
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].label, "t1");
        assert_eq!(partial[0].payload, "R1");
        assert!(err.to_string().contains("Batch aborted at t2"));
    });
}

struct UppercaseWorker;

#[async_trait]
impl Worker for UppercaseWorker {
    fn tag(&self) -> &str {
        "Shouter"
    }

    async fn run(
        &self,
        task: &Task,
        _goal: &str,
        generator: &Generator,
    ) -> Result<WorkerResult, OrchestrationError> {
        let text = generator.text(&task.description).await?;
        Ok(WorkerResult {
            task_id: task.id.clone(),
            worker_tag: self.tag().to_string(),
            payload: text.to_uppercase(),
        })
    }
}

#[test]
fn test_custom_worker_and_strict_aggregation() {
    paused_runtime().block_on(async {
        let stub = Arc::new(StubService::new());
        let mut registry = WorkerRegistry::with_default_workers();
        registry.register("Shouter", Arc::new(UppercaseWorker));

        let plan = Plan::new(
            "g",
            vec![Task::new("a", "quiet words", "Shouter"), Task::new("b", "more", "Shouter")],
        );
        let results = PlanExecutor::new(Arc::new(registry), generator(&stub))
            .execute(&plan)
            .await
            .unwrap();
        assert_eq!(results[0].payload, "QUIET WORDS");

        let strict = ResultAggregator::new(generator(&stub)).with_mode(AggregationMode::Strict);
        let err = strict.concatenate(&results[..1], &plan).unwrap_err();
        assert!(matches!(err, OrchestrationError::MissingResult(ref id) if id == "b"));
    });
}
