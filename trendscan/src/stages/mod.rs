//! Pipeline stages.
//!
//! Each stage reads its required fields from the run state and returns a
//! JSON partial update the executor merges back into it. Stage outputs are
//! what the memoizer caches, so they stay plain serializable objects.

mod clean;
mod extract;
mod query;
mod report;
mod search;
mod summarize;

pub use clean::CleanProductsStage;
pub use extract::ExtractProductsStage;
pub use query::GenerateQueryStage;
pub use report::FinalSummaryStage;
pub use search::WebSearchStage;
pub use summarize::SummarizeProductsStage;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::errors::TrendscanError;
use crate::state::PipelineState;

/// Trait for pipeline stages.
///
/// A stage either fully succeeds with a partial update, or fails; there is
/// no partial success within a stage. Fallback to stale cache happens in the
/// memoizer, not here.
#[async_trait]
pub trait PipelineStage: Send + Sync + Debug {
    /// Returns the stage name used for cache keys and logs.
    fn name(&self) -> &str;

    /// Executes the stage against the current state.
    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError>;
}
