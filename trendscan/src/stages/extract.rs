//! Product-extraction stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::PipelineStage;
use crate::concurrency::gather_bounded;
use crate::errors::{TaskError, TrendscanError};
use crate::providers::{TaskFunction, TaskInput, TaskKind};
use crate::state::PipelineState;

/// Pulls product names out of each search-result page.
///
/// Pages are processed concurrently under a bounded fan-out; a page that
/// fails (or has no usable text) yields `None` at its index so page order
/// is preserved for the summarize stage.
pub struct ExtractProductsStage {
    task: Arc<dyn TaskFunction>,
    concurrency: usize,
}

impl ExtractProductsStage {
    /// The stage name.
    pub const NAME: &'static str = "extract_products";

    /// Creates the stage with the given fan-out limit.
    #[must_use]
    pub fn new(task: Arc<dyn TaskFunction>, concurrency: usize) -> Self {
        Self { task, concurrency }
    }
}

impl fmt::Debug for ExtractProductsStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractProductsStage")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for ExtractProductsStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError> {
        let category = state.require_category(Self::NAME)?;
        let results = state.require_search_results(Self::NAME)?;
        tracing::info!(category, pages = results.len(), "extracting product names");

        let task = &self.task;
        let outcomes = gather_bounded(results.iter(), self.concurrency, |index, page| {
            let category = category.to_string();
            async move {
                let Some(text) = page.page_text() else {
                    return Err(TaskError::empty_output(format!(
                        "search result {index} has no usable text"
                    )));
                };
                let input = TaskInput::new(TaskKind::ProductExtraction)
                    .with_var("text", text)
                    .with_var("category", category);
                task.invoke(input).await
            }
        })
        .await;

        let products: Vec<Option<String>> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                Ok(content) => Some(content),
                Err(err) => {
                    tracing::warn!(page = index, error = %err, "extraction failed for page");
                    None
                }
            })
            .collect();

        tracing::info!(pages = products.len(), "extracted products for pages");
        Ok(json!({ "extracted_products": products }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{text_item, RecordingTask};
    use crate::providers::SearchItem;

    fn state_with_pages(pages: Vec<SearchItem>) -> PipelineState {
        let mut state = PipelineState::new("Energy Drinks");
        state.search_results = Some(pages);
        state
    }

    #[tokio::test]
    async fn test_extracts_one_entry_per_page_in_order() {
        let task = Arc::new(RecordingTask::new(|input| {
            let text = input.var("text").and_then(Value::as_str).unwrap_or_default();
            Ok(format!("products from: {text}"))
        }));
        let stage = ExtractProductsStage::new(task.clone(), 2);
        let state = state_with_pages(vec![text_item("page a"), text_item("page b")]);

        let update = stage.execute(&state).await.unwrap();
        let products = update["extracted_products"].as_array().unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0], "products from: page a");
        assert_eq!(products[1], "products from: page b");
        assert_eq!(task.call_count(), 2);
    }

    #[tokio::test]
    async fn test_page_without_text_yields_none_marker() {
        let task = Arc::new(RecordingTask::with_reply("something"));
        let stage = ExtractProductsStage::new(task.clone(), 3);
        let state = state_with_pages(vec![
            text_item("page a"),
            SearchItem::default(),
            text_item("page c"),
        ]);

        let update = stage.execute(&state).await.unwrap();
        let products = update["extracted_products"].as_array().unwrap();

        assert_eq!(products.len(), 3);
        assert!(!products[0].is_null());
        assert!(products[1].is_null());
        assert!(!products[2].is_null());
        // Only the two usable pages reached the model.
        assert_eq!(task.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_search_results_is_input_error() {
        let task = Arc::new(RecordingTask::with_reply("x"));
        let stage = ExtractProductsStage::new(task, 3);
        let state = PipelineState::new("Energy Drinks");

        let result = stage.execute(&state).await;
        assert!(matches!(result, Err(TrendscanError::Input(_))));
    }

    #[tokio::test]
    async fn test_model_failure_isolated_per_page() {
        let task = Arc::new(RecordingTask::new(|input| {
            let text = input.var("text").and_then(Value::as_str).unwrap_or_default();
            if text.contains("bad") {
                Err(crate::errors::TaskError::model("rate limited"))
            } else {
                Ok("ok".to_string())
            }
        }));
        let stage = ExtractProductsStage::new(task, 2);
        let state = state_with_pages(vec![
            text_item("good page"),
            text_item("bad page"),
            text_item("good page"),
        ]);

        let update = stage.execute(&state).await.unwrap();
        let products = update["extracted_products"].as_array().unwrap();

        assert!(!products[0].is_null());
        assert!(products[1].is_null());
        assert!(!products[2].is_null());
    }
}
