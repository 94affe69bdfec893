//! Search-query generation stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::PipelineStage;
use crate::errors::{TaskError, TrendscanError};
use crate::providers::{TaskFunction, TaskInput, TaskKind};
use crate::state::PipelineState;

/// Turns the run's category into a web-search query.
pub struct GenerateQueryStage {
    task: Arc<dyn TaskFunction>,
}

impl GenerateQueryStage {
    /// The stage name.
    pub const NAME: &'static str = "generate_query";

    /// Creates the stage.
    #[must_use]
    pub fn new(task: Arc<dyn TaskFunction>) -> Self {
        Self { task }
    }
}

impl fmt::Debug for GenerateQueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateQueryStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for GenerateQueryStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError> {
        let category = state.require_category(Self::NAME)?;

        let input = TaskInput::new(TaskKind::QueryGeneration).with_var("category", category);
        let query = self.task.invoke(input).await?.trim().to_string();
        if query.is_empty() {
            return Err(TaskError::empty_output("query generation returned no text").into());
        }

        tracing::info!(category, query = %query, "generated search query");
        Ok(json!({
            "search_query": query,
            "messages": [format!("Generated search query: {query}")],
        }))
    }
}
