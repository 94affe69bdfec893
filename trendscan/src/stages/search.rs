//! Web-search stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use super::PipelineStage;
use crate::errors::TrendscanError;
use crate::providers::SearchProvider;
use crate::state::PipelineState;

/// Runs the generated query against the search provider.
pub struct WebSearchStage {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchStage {
    /// The stage name.
    pub const NAME: &'static str = "web_search";

    /// Creates the stage.
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for WebSearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSearchStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for WebSearchStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, state: &PipelineState) -> Result<Value, TrendscanError> {
        let query = state.require_query(Self::NAME)?;

        let response = self.provider.search(query).await?;
        tracing::info!(items = response.results.len(), "web search returned items");

        Ok(json!({ "search_results": response.results }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{text_item, StaticSearchProvider};

    #[tokio::test]
    async fn test_search_stores_results() {
        let provider = Arc::new(StaticSearchProvider::new(vec![
            text_item("page one"),
            text_item("page two"),
        ]));
        let stage = WebSearchStage::new(provider.clone());

        let mut state = PipelineState::new("Beer");
        state.search_query = Some("best beers 2025".to_string());

        let update = stage.execute(&state).await.unwrap();

        assert_eq!(update["search_results"].as_array().unwrap().len(), 2);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.queries(), vec!["best beers 2025".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_query_is_input_error() {
        let provider = Arc::new(StaticSearchProvider::new(Vec::new()));
        let stage = WebSearchStage::new(provider.clone());
        let state = PipelineState::new("Beer");

        let result = stage.execute(&state).await;

        assert!(matches!(result, Err(TrendscanError::Input(_))));
        assert_eq!(provider.call_count(), 0);
    }
}
