//! Duplicate-removal stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::PipelineStage;
use crate::errors::TrendscanError;
use crate::providers::{TaskFunction, TaskInput, TaskKind};
use crate::state::PipelineState;
use crate::text::json_or_text;

/// Collapses duplicate products across the per-page summaries.
pub struct CleanProductsStage {
    task: Arc<dyn TaskFunction>,
}

impl CleanProductsStage {
    /// The stage name.
    pub const NAME: &'static str = "clean_products";

    /// Creates the stage.
    #[must_use]
    pub fn new(task: Arc<dyn TaskFunction>) -> Self {
        Self { task }
    }
}

impl fmt::Debug for CleanProductsStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanProductsStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for CleanProductsStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError> {
        let category = state.require_category(Self::NAME)?;
        let summaries = state.require_summaries(Self::NAME)?;
        tracing::info!(category, items = summaries.len(), "removing duplicate products");

        // Feed the analysis where one exists, the full marker item otherwise,
        // so the model sees which pages produced nothing.
        let items: Vec<Value> = summaries
            .iter()
            .map(|summary| match &summary.analysis {
                Some(analysis) => analysis.clone(),
                None => serde_json::to_value(summary).unwrap_or(Value::Null),
            })
            .collect();

        let input = TaskInput::new(TaskKind::DuplicateRemoval)
            .with_var("category", category)
            .with_var("products", Value::Array(items));
        let output = self.task.invoke(input).await?;

        Ok(json!({ "final_product_summaries": json_or_text(&output) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ProductSummary;
    use crate::testing::RecordingTask;

    fn state_with_summaries(summaries: Vec<ProductSummary>) -> PipelineState {
        let mut state = PipelineState::new("Wine");
        state.product_summaries = Some(summaries);
        state
    }

    #[tokio::test]
    async fn test_cleans_products_into_structured_list() {
        let task = Arc::new(RecordingTask::with_reply(
            "```json\n[{\"name\": \"Merlot\"}, {\"name\": \"Pinot Noir\"}]\n```",
        ));
        let stage = CleanProductsStage::new(task.clone());
        let state = state_with_summaries(vec![
            ProductSummary::ok(json!({"name": "Merlot"})),
            ProductSummary::ok(json!({"name": "Merlot"})),
            ProductSummary::ok(json!({"name": "Pinot Noir"})),
        ]);

        let update = stage.execute(&state).await.unwrap();

        assert_eq!(
            update["final_product_summaries"],
            json!([{"name": "Merlot"}, {"name": "Pinot Noir"}])
        );
        let calls = task.calls();
        assert_eq!(calls[0].kind, TaskKind::DuplicateRemoval);
        assert_eq!(
            calls[0].var("products").unwrap().as_array().unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades_to_text() {
        let task = Arc::new(RecordingTask::with_reply("Merlot and Pinot Noir remain"));
        let stage = CleanProductsStage::new(task);
        let state = state_with_summaries(vec![ProductSummary::ok(json!("Merlot"))]);

        let update = stage.execute(&state).await.unwrap();

        assert_eq!(
            update["final_product_summaries"],
            json!("Merlot and Pinot Noir remain")
        );
    }

    #[tokio::test]
    async fn test_missing_summaries_is_input_error() {
        let task = Arc::new(RecordingTask::with_reply("x"));
        let stage = CleanProductsStage::new(task);
        let state = PipelineState::new("Wine");

        let result = stage.execute(&state).await;
        assert!(matches!(result, Err(TrendscanError::Input(_))));
    }

    #[tokio::test]
    async fn test_failed_summaries_passed_through_as_markers() {
        let task = Arc::new(RecordingTask::with_reply("[]"));
        let stage = CleanProductsStage::new(task.clone());
        let state = state_with_summaries(vec![ProductSummary::failed("page failed")]);

        stage.execute(&state).await.unwrap();

        let calls = task.calls();
        let products = calls[0].var("products").unwrap().as_array().unwrap().clone();
        assert_eq!(products[0]["_error"], json!("page failed"));
    }
}
