//! Tavily search API client.

use async_trait::async_trait;
use serde_json::json;
use std::fmt;

use super::{SearchProvider, SearchResponse};
use crate::config::{DateWindow, SearchConfig};
use crate::errors::TaskError;

const SEARCH_ENDPOINT: &str = "https://api.tavily.com/search";

/// [`SearchProvider`] backed by the Tavily HTTP search API.
#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    config: SearchConfig,
    window: Option<DateWindow>,
}

impl TavilyClient {
    /// Creates a client with default search parameters.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            config: SearchConfig::default(),
            window: None,
        }
    }

    /// Sets the search parameters.
    #[must_use]
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Restricts searches to a date window.
    #[must_use]
    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// The configured search parameters.
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}

impl fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyClient")
            .field("api_key", &"<redacted>")
            .field("config", &self.config)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, TaskError> {
        let mut body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": self.config.search_depth,
            "max_results": self.config.max_results,
            "time_range": self.config.time_range,
            "include_raw_content": self.config.include_raw_content,
            "chunks_per_source": self.config.chunks_per_source,
            "country": self.config.country,
            "include_answer": self.config.include_answer,
        });
        if let Some(window) = &self.window {
            body["start_date"] = json!(window.start_str());
            body["end_date"] = json!(window.end_str());
        }

        let response = self
            .http
            .post(SEARCH_ENDPOINT)
            .json(&body)
            .send()
            .await
            .map_err(|err| TaskError::search(err.to_string()))?
            .error_for_status()
            .map_err(|err| TaskError::search(err.to_string()))?;

        response
            .json::<SearchResponse>()
            .await
            .map_err(|err| TaskError::search(err.to_string()))
    }
}
