//! Product-summarization stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::PipelineStage;
use crate::concurrency::gather_bounded;
use crate::errors::{TaskError, TrendscanError};
use crate::providers::{SearchItem, TaskFunction, TaskInput, TaskKind};
use crate::state::{PipelineState, ProductSummary};
use crate::text::parse_fenced_json;

/// Summarizes each extracted product against its page content.
///
/// Products and pages are paired by index; pairs run concurrently under a
/// bounded fan-out and failures stay isolated to their pair.
pub struct SummarizeProductsStage {
    task: Arc<dyn TaskFunction>,
    concurrency: usize,
}

impl SummarizeProductsStage {
    /// The stage name.
    pub const NAME: &'static str = "summarize_products";

    /// Creates the stage with the given fan-out limit.
    #[must_use]
    pub fn new(task: Arc<dyn TaskFunction>, concurrency: usize) -> Self {
        Self { task, concurrency }
    }
}

impl fmt::Debug for SummarizeProductsStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizeProductsStage")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for SummarizeProductsStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError> {
        let category = state.require_category(Self::NAME)?;
        let products = state.require_products(Self::NAME)?;
        let results = state.require_search_results(Self::NAME)?;
        tracing::info!(category, products = products.len(), "summarizing products");

        let pages: Vec<Option<String>> = results.iter().map(SearchItem::page_text).collect();
        let task = &self.task;

        let outcomes = gather_bounded(
            products.iter().zip(pages.iter()),
            self.concurrency,
            |_, (product, page)| {
                let category = category.to_string();
                async move {
                    let Some(product) = product.as_deref() else {
                        return Ok(ProductSummary::failed("no product extracted for this page"));
                    };
                    let Some(page) = page.as_deref() else {
                        return Ok(ProductSummary::failed("no usable page text"));
                    };
                    let input = TaskInput::new(TaskKind::ProductSummary)
                        .with_var("data", page)
                        .with_var("product", product)
                        .with_var("category", category);
                    let output = task.invoke(input).await?;
                    Ok::<_, TaskError>(ProductSummary::ok(analysis_from_output(&output)))
                }
            },
        )
        .await;

        let summaries: Vec<ProductSummary> = outcomes
            .into_iter()
            .map(|outcome| outcome.unwrap_or_else(|err| ProductSummary::failed(err.to_string())))
            .collect();

        tracing::info!(summaries = summaries.len(), "generated product summaries");
        Ok(json!({ "product_summaries": summaries }))
    }
}

/// Interprets one summary reply: a fenced JSON object may carry the analysis
/// under `Product_Analysis`; anything unparseable degrades to the raw text.
fn analysis_from_output(output: &str) -> Value {
    match parse_fenced_json(output) {
        Ok(Value::Object(fields)) => {
            if let Some(analysis) = fields.get("Product_Analysis") {
                analysis.clone()
            } else {
                Value::Object(fields)
            }
        }
        Ok(other) => other,
        Err(err) => {
            tracing::warn!(error = %err, "summary output was not valid JSON, keeping raw text");
            Value::String(output.trim().to_string())
        }
    }
}
