//! Final-report synthesis stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::PipelineStage;
use crate::errors::TrendscanError;
use crate::providers::{TaskFunction, TaskInput, TaskKind};
use crate::state::PipelineState;
use crate::text::json_or_text;

/// Synthesizes the final category report from the cleaned product summaries.
///
/// This is the terminal stage: its cached result allows a whole run to be
/// answered without executing anything.
pub struct FinalSummaryStage {
    task: Arc<dyn TaskFunction>,
}

impl FinalSummaryStage {
    /// The stage name.
    pub const NAME: &'static str = "final_summary";

    /// Creates the stage.
    #[must_use]
    pub fn new(task: Arc<dyn TaskFunction>) -> Self {
        Self { task }
    }
}

impl fmt::Debug for FinalSummaryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalSummaryStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for FinalSummaryStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError> {
        let category = state.require_category(Self::NAME)?;
        let products = state.require_final_products(Self::NAME)?;

        let input = TaskInput::new(TaskKind::FinalReport)
            .with_var("category", category)
            .with_var("data", products.clone());
        let output = self.task.invoke(input).await?;

        tracing::info!(category, "final report created");
        Ok(json!({
            "final_report": json_or_text(&output),
            "messages": [format!("Final report created for {category}")],
        }))
    }
}
