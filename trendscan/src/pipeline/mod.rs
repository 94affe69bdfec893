//! Pipeline assembly and execution.
//!
//! The executor runs a fixed, linear stage order over one state instance.
//! Every stage goes through the memoizer, and a run whose terminal result is
//! already cached returns without executing anything at all.


use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheStore, MemoScope, Memoizer, RefreshMode};
use crate::config::RunConfig;
use crate::errors::{InputError, TrendscanError};
use crate::providers::{SearchProvider, TaskFunction};
use crate::stages::{
    CleanProductsStage, ExtractProductsStage, FinalSummaryStage, GenerateQueryStage,
    PipelineStage, SummarizeProductsStage, WebSearchStage,
};
use crate::state::PipelineState;

/// Execution status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The run has not begun executing stages.
    NotStarted,
    /// The stage at this index is executing.
    Running(usize),
    /// The run finished, fresh or from cache.
    Completed,
    /// A stage failed without a fallback.
    Failed,
}

impl RunStatus {
    /// Returns true for the end states of a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running(index) => write!(f, "running:{index}"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The memoizing pipeline executor.
pub struct Pipeline {
    stages: Vec<Arc<dyn PipelineStage>>,
    memo: Memoizer,
    config: RunConfig,
}

impl Pipeline {
    /// Assembles the standard six-stage research pipeline.
    #[must_use]
    pub fn standard(
        task: Arc<dyn TaskFunction>,
        search: Arc<dyn SearchProvider>,
        store: Arc<dyn CacheStore>,
        config: RunConfig,
    ) -> Self {
        let stages: Vec<Arc<dyn PipelineStage>> = vec![
            Arc::new(GenerateQueryStage::new(task.clone())),
            Arc::new(WebSearchStage::new(search)),
            Arc::new(ExtractProductsStage::new(
                task.clone(),
                config.extract_concurrency,
            )),
            Arc::new(SummarizeProductsStage::new(
                task.clone(),
                config.summarize_concurrency,
            )),
            Arc::new(CleanProductsStage::new(task.clone())),
            Arc::new(FinalSummaryStage::new(task)),
        ];
        Self::with_stages(stages, store, config)
    }

    /// Builds a pipeline over a custom ordered stage list.
    #[must_use]
    pub fn with_stages(
        stages: Vec<Arc<dyn PipelineStage>>,
        store: Arc<dyn CacheStore>,
        config: RunConfig,
    ) -> Self {
        Self {
            stages,
            memo: Memoizer::new(store),
            config,
        }
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs the pipeline for one category, returning the final state.
    ///
    /// Re-running after a failure is the retry mechanism: completed stages
    /// hit their caches and only the failed stage re-executes, because
    /// failures are never cached.
    pub async fn run(&self, category: &str) -> Result<PipelineState, TrendscanError> {
        if category.trim().is_empty() {
            return Err(InputError::new("run", "category").into());
        }

        let window = self.config.window;
        let scope = MemoScope::new(category, window);
        let run_id = uuid::Uuid::new_v4();

        let mut state = PipelineState::new(category);
        state
            .metadata
            .insert("run_id".to_string(), Value::String(run_id.to_string()));
        state.metadata.insert(
            "started_at".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );

        let mut status = RunStatus::NotStarted;
        tracing::debug!(%run_id, category, status = %status, "run created");

        // Fast path: the terminal stage's cached result answers the whole
        // run, so probe it directly before touching any stage.
        if self.config.refresh == RefreshMode::UseCache {
            if let Some(terminal) = self.stages.last() {
                let key = scope.key_for(terminal.name());
                if let Some(cached) = self.memo.store().get(&key).await? {
                    state.apply_update(&cached)?;
                    state.from_cache = true;
                    status = RunStatus::Completed;
                    state
                        .metadata
                        .insert("run_status".to_string(), Value::String(status.to_string()));
                    tracing::info!(
                        %run_id,
                        category,
                        stage = terminal.name(),
                        "terminal result cached, returning without executing stages"
                    );
                    return Ok(state);
                }
            }
        }

        tracing::info!(%run_id, category, window = %window.label(), "executing stages");
        for (index, stage) in self.stages.iter().enumerate() {
            status = RunStatus::Running(index);
            tracing::debug!(%run_id, stage = stage.name(), status = %status, "stage starting");

            let update = self
                .memo
                .run_mode(stage.name(), &scope, self.config.refresh, || {
                    stage.execute(&state)
                })
                .await
                .map_err(|err| {
                    tracing::error!(
                        %run_id,
                        stage = stage.name(),
                        status = %RunStatus::Failed,
                        error = %err,
                        "stage failed, aborting run"
                    );
                    TrendscanError::for_stage(stage.name(), category, window.label(), err)
                })?;

            state.apply_update(&update)?;
        }

        state.from_cache = false;
        status = RunStatus::Completed;
        state
            .metadata
            .insert("run_status".to_string(), Value::String(status.to_string()));
        tracing::info!(%run_id, category, "run completed");
        Ok(state)
    }

    /// Removes every cached entry. Destructive and all-or-nothing: there is
    /// no selective invalidation.
    pub async fn clear_cache(&self) -> Result<(), TrendscanError> {
        self.memo.store().clear().await?;
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
