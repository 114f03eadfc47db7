//! CLI route: single route table and run context. Dispatches to engine components and presentation.

use crate::aggregate::ResultAggregator;
use crate::config::{ConductorConfig, ConfigLoader};
use crate::error::OrchestrationError;
use crate::execution::PlanExecutor;
use crate::fanout::{story_prompts, FanOutExecutor};
use crate::plan::Planner;
use crate::provider::{Credentials, Generator, ProviderFactory, ProviderKind};
use crate::refine::RefinementLoop;
use crate::router::{HandlerRegistry, Router};
use crate::worker::WorkerRegistry;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::cli::parse::Commands;
use crate::cli::presentation;

/// Runtime context for CLI execution: validated config, the generator and both dispatch tables.
pub struct RunContext {
    config: ConductorConfig,
    generator: Generator,
    workers: Arc<WorkerRegistry>,
    handlers: HandlerRegistry,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Build from an already-loaded config.
    ///
    /// Credentials are read from the environment here, once, before any call is made.
    pub fn with_config(config: ConductorConfig) -> Result<Self, OrchestrationError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            OrchestrationError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let credentials = match config.provider.kind {
            ProviderKind::Stub => None,
            _ => Some(Credentials::from_env(&config.provider.api_key_env)?),
        };
        let service = ProviderFactory::create_service(&config.provider, credentials)?;
        let generator = Generator::new(service, config.provider.model.clone())
            .with_policy(config.calls.to_policy());

        let mut workers = WorkerRegistry::with_default_workers();
        workers.load_from_config(&config)?;
        let mut handlers = HandlerRegistry::with_default_handlers();
        handlers.load_from_config(&config.routes)?;

        debug!(
            provider = ?config.provider.kind,
            model = %config.provider.model,
            workers = workers.len(),
            categories = handlers.len(),
            "Run context initialized"
        );
        Ok(Self {
            config,
            generator,
            workers: Arc::new(workers),
            handlers,
        })
    }

    /// Execute a CLI command via the single route table on a current-thread runtime.
    ///
    /// Ctrl-C cancels the generator's token, which aborts any in-flight batch.
    pub fn execute(&self, command: &Commands) -> Result<String, OrchestrationError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| OrchestrationError::Config(format!("Failed to start runtime: {}", e)))?;

        runtime.block_on(async {
            let cancel = self.generator.cancellation().clone();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
            let started = Instant::now();
            let result = self.execute_inner(command).await;
            interrupt.abort();
            info!(
                command = command.name(),
                ok = result.is_ok(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Command finished"
            );
            result
        })
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, OrchestrationError> {
        match command {
            Commands::FanOut { topic } => {
                let executor = FanOutExecutor::new(self.generator.clone());
                let report = executor.run(&story_prompts(topic)).await?;
                Ok(presentation::format_fan_out(&report))
            }
            Commands::Plan { goal } => {
                let planner = Planner::new(self.generator.clone());
                let plan = planner.plan(goal, &self.workers.tags()).await?;
                let executor = PlanExecutor::new(Arc::clone(&self.workers), self.generator.clone());
                let report = executor.run(&plan).await?;
                let aggregator = ResultAggregator::new(self.generator.clone())
                    .with_mode(self.config.aggregation.mode);
                let combined = aggregator.combine(&report.results, &plan).await?;
                presentation::format_plan(&report, &combined)
            }
            Commands::Refine {
                topic,
                max_iterations,
                bound,
            } => {
                let mut config = self.config.refinement.clone();
                if let Some(max_iterations) = max_iterations {
                    config.max_iterations = *max_iterations;
                }
                if let Some(bound) = bound {
                    config.bound = (*bound).into();
                }
                config.validate().map_err(OrchestrationError::Config)?;
                let outcome = RefinementLoop::new(self.generator.clone(), config)
                    .run(topic)
                    .await?;
                Ok(presentation::format_refinement(&outcome))
            }
            Commands::Route { query } => {
                let router = Router::new(self.generator.clone(), self.handlers.clone());
                let outcome = router.route(query).await?;
                Ok(presentation::format_route(&outcome))
            }
            Commands::Config => self.config.to_toml(),
        }
    }
}

/// Load from an explicit file when given, otherwise layer the workspace sources.
pub fn load_config(
    workspace_root: &Path,
    config_path: Option<&Path>,
) -> Result<ConductorConfig, OrchestrationError> {
    match config_path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(workspace_root),
    }
}
