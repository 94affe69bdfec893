//! Mock collaborators for exercising the pipeline without external
//! providers.
//!
//! These record every call they receive, so tests can assert not just on
//! outputs but on whether the expensive collaborator was invoked at all.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::fmt;

use crate::errors::TaskError;
use crate::providers::{
    SearchItem, SearchProvider, SearchResponse, TaskFunction, TaskInput, TaskKind,
};

type Responder = Box<dyn Fn(&TaskInput) -> Result<String, TaskError> + Send + Sync>;

/// A task function that records calls and answers via a responder closure.
pub struct RecordingTask {
    responder: Responder,
    calls: Mutex<Vec<TaskInput>>,
}

impl RecordingTask {
    /// Creates a task answering via the given responder.
    #[must_use]
    pub fn new(
        responder: impl Fn(&TaskInput) -> Result<String, TaskError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a task answering every call with the same text.
    #[must_use]
    pub fn with_reply(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Creates a task failing every call.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(move |_| Err(TaskError::model(reason.clone())))
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of calls received for one task kind.
    #[must_use]
    pub fn calls_of(&self, kind: TaskKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TaskInput> {
        self.calls.lock().clone()
    }
}

impl fmt::Debug for RecordingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTask")
            .field("call_count", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskFunction for RecordingTask {
    async fn invoke(&self, input: TaskInput) -> Result<String, TaskError> {
        self.calls.lock().push(input.clone());
        (self.responder)(&input)
    }
}

/// A search provider that records queries and returns fixed items.
#[derive(Debug)]
pub struct StaticSearchProvider {
    items: Vec<SearchItem>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearchProvider {
    /// Creates a provider answering every query with the given items.
    #[must_use]
    pub fn new(items: Vec<SearchItem>) -> Self {
        Self {
            items,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Number of searches performed.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// All recorded queries, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    async fn search(&self, query: &str) -> Result<SearchResponse, TaskError> {
        self.queries.lock().push(query.to_string());
        Ok(SearchResponse {
            results: self.items.clone(),
        })
    }
}

/// A search provider that fails every query.
#[derive(Debug)]
pub struct FailingSearchProvider {
    reason: String,
}

impl FailingSearchProvider {
    /// Creates a provider failing with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for FailingSearchProvider {
    async fn search(&self, _query: &str) -> Result<SearchResponse, TaskError> {
        Err(TaskError::search(self.reason.clone()))
    }
}

/// A search item whose `content` is the given text.
#[must_use]
pub fn text_item(content: &str) -> SearchItem {
    SearchItem {
        content: Some(json!(content)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_task_counts_calls() {
        let task = RecordingTask::with_reply("hello");

        assert_eq!(task.call_count(), 0);

        let out = task
            .invoke(TaskInput::new(TaskKind::QueryGeneration))
            .await
            .unwrap();

        assert_eq!(out, "hello");
        assert_eq!(task.call_count(), 1);
        assert_eq!(task.calls_of(TaskKind::QueryGeneration), 1);
        assert_eq!(task.calls_of(TaskKind::FinalReport), 0);
    }

    #[tokio::test]
    async fn test_failing_task() {
        let task = RecordingTask::failing("down");
        let result = task.invoke(TaskInput::new(TaskKind::FinalReport)).await;
        assert!(result.is_err());
        assert_eq!(task.call_count(), 1);
    }

    #[tokio::test]
    async fn test_static_search_provider_records_queries() {
        let provider = StaticSearchProvider::new(vec![text_item("body")]);

        let response = provider.search("beers").await.unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(provider.queries(), vec!["beers".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_search_provider() {
        let provider = FailingSearchProvider::new("offline");
        assert!(provider.search("anything").await.is_err());
    }
}
