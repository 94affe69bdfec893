//! Protocol traits and models for the external task and search capabilities.
//!
//! The pipeline never talks to a concrete model or search vendor directly;
//! it goes through these traits, which keeps stages testable and providers
//! swappable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::errors::TaskError;

#[cfg(feature = "tavily")]
mod tavily;

#[cfg(feature = "tavily")]
pub use tavily::TavilyClient;

/// The kind of generative task being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Turn a category into a web-search query.
    QueryGeneration,
    /// Pull product names out of one page of search content.
    ProductExtraction,
    /// Summarize one product against its page content.
    ProductSummary,
    /// Collapse duplicate products across summaries.
    DuplicateRemoval,
    /// Synthesize the final category report.
    FinalReport,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryGeneration => write!(f, "query_generation"),
            Self::ProductExtraction => write!(f, "product_extraction"),
            Self::ProductSummary => write!(f, "product_summary"),
            Self::DuplicateRemoval => write!(f, "duplicate_removal"),
            Self::FinalReport => write!(f, "final_report"),
        }
    }
}

/// Structured input passed to a task function.
///
/// Prompt templating lives behind the [`TaskFunction`] implementation; the
/// pipeline only names the task and supplies its variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInput {
    /// Which task is being requested.
    pub kind: TaskKind,
    /// Named variables the task's template is rendered with.
    pub vars: HashMap<String, Value>,
}

impl TaskInput {
    /// Creates an input with no variables.
    #[must_use]
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            vars: HashMap::new(),
        }
    }

    /// Adds a variable.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Looks up a variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// Protocol for the generative-model capability.
#[async_trait]
pub trait TaskFunction: Send + Sync {
    /// Invokes the task, returning the model's raw text output.
    async fn invoke(&self, input: TaskInput) -> Result<String, TaskError>;
}

/// One item returned by the search provider.
///
/// `content` and `raw_content` are kept as raw JSON because providers are
/// not consistent about them: either may be text, null, or absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchItem {
    /// Result title, when the provider sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Source URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Snippet-style content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Full extracted page content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<Value>,
    /// Provider relevance score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchItem {
    /// Combines `content` and `raw_content` into the single text blob the
    /// extraction and summarization stages consume.
    ///
    /// Both text: concatenated with a space. One text: that one. Neither:
    /// no usable text.
    #[must_use]
    pub fn page_text(&self) -> Option<String> {
        let content = self.content.as_ref().and_then(Value::as_str);
        let raw = self.raw_content.as_ref().and_then(Value::as_str);
        match (content, raw) {
            (Some(content), Some(raw)) => Some(format!("{content} {raw}")),
            (Some(content), None) => Some(content.to_string()),
            (None, Some(raw)) => Some(raw.to_string()),
            (None, None) => None,
        }
    }
}

/// Response envelope from the search provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The result items.
    #[serde(default)]
    pub results: Vec<SearchItem>,
}

/// Protocol for the web-search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a search query.
    async fn search(&self, query: &str) -> Result<SearchResponse, TaskError>;
}
