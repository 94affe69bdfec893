//! The evolving state threaded through a pipeline run.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{InputError, ParseError};
use crate::providers::SearchItem;

/// One product summary produced by the summarize stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// The model's analysis, absent when the item failed.
    #[serde(default)]
    pub analysis: Option<Value>,
    /// Error marker for an isolated per-item failure.
    #[serde(rename = "_error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProductSummary {
    /// A summary carrying an analysis.
    #[must_use]
    pub fn ok(analysis: Value) -> Self {
        Self {
            analysis: Some(analysis),
            error: None,
        }
    }

    /// An error marker in place of a summary.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            analysis: None,
            error: Some(error.into()),
        }
    }
}

/// State record threaded through the pipeline stages.
///
/// `category` is required up front; every other field is populated by the
/// stage that produces it, strictly in pipeline order. One run owns one
/// state instance exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// The category the run researches.
    pub category: String,
    /// Search query produced by the query-generation stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    /// Raw results from the web-search stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchItem>>,
    /// Per-page extracted product names; `None` marks a page that yielded
    /// nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_products: Option<Vec<Option<String>>>,
    /// Per-product summaries, one per page in page order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_summaries: Option<Vec<ProductSummary>>,
    /// De-duplicated product summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_product_summaries: Option<Value>,
    /// The synthesized category report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_report: Option<Value>,
    /// Human-readable progress messages appended by stages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    /// Free-form metadata: run identity, status, stale-error annotations.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
    /// Whether the terminal result was served from cache. Set exactly once
    /// per run.
    #[serde(default)]
    pub from_cache: bool,
}

impl PipelineState {
    /// Creates the initial state for a category.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            search_query: None,
            search_results: None,
            extracted_products: None,
            product_summaries: None,
            final_product_summaries: None,
            final_report: None,
            messages: Vec::new(),
            metadata: HashMap::new(),
            from_cache: false,
        }
    }

    /// Merges a stage's partial JSON update into the named fields.
    ///
    /// `messages` entries are appended; keys with no named field (including
    /// stale-error annotations) land in `metadata`.
    pub fn apply_update(&mut self, update: &Value) -> Result<(), ParseError> {
        let Some(fields) = update.as_object() else {
            return Err(ParseError::new(
                "stage update is not a JSON object",
                &update.to_string(),
            ));
        };

        for (field, value) in fields {
            match field.as_str() {
                "search_query" => self.search_query = Some(decode(field, value)?),
                "search_results" => self.search_results = Some(decode(field, value)?),
                "extracted_products" => self.extracted_products = Some(decode(field, value)?),
                "product_summaries" => self.product_summaries = Some(decode(field, value)?),
                "final_product_summaries" => {
                    self.final_product_summaries = Some(value.clone());
                }
                "final_report" => self.final_report = Some(value.clone()),
                "messages" => {
                    if let Some(entries) = value.as_array() {
                        self.messages.extend(
                            entries
                                .iter()
                                .filter_map(Value::as_str)
                                .map(ToString::to_string),
                        );
                    }
                }
                _ => {
                    self.metadata.insert(field.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Appends a progress message.
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// The category, required non-empty.
    pub fn require_category(&self, stage: &str) -> Result<&str, InputError> {
        if self.category.trim().is_empty() {
            return Err(InputError::new(stage, "category"));
        }
        Ok(&self.category)
    }

    /// The search query produced upstream.
    pub fn require_query(&self, stage: &str) -> Result<&str, InputError> {
        self.search_query
            .as_deref()
            .filter(|query| !query.trim().is_empty())
            .ok_or_else(|| InputError::new(stage, "search_query"))
    }

    /// The search results produced upstream, required non-empty.
    pub fn require_search_results(&self, stage: &str) -> Result<&[SearchItem], InputError> {
        self.search_results
            .as_deref()
            .filter(|results| !results.is_empty())
            .ok_or_else(|| InputError::new(stage, "search_results"))
    }

    /// The extracted products produced upstream, required non-empty.
    pub fn require_products(&self, stage: &str) -> Result<&[Option<String>], InputError> {
        self.extracted_products
            .as_deref()
            .filter(|products| !products.is_empty())
            .ok_or_else(|| InputError::new(stage, "extracted_products"))
    }

    /// The product summaries produced upstream, required non-empty.
    pub fn require_summaries(&self, stage: &str) -> Result<&[ProductSummary], InputError> {
        self.product_summaries
            .as_deref()
            .filter(|summaries| !summaries.is_empty())
            .ok_or_else(|| InputError::new(stage, "product_summaries"))
    }

    /// The de-duplicated products produced upstream.
    pub fn require_final_products(&self, stage: &str) -> Result<&Value, InputError> {
        self.final_product_summaries
            .as_ref()
            .filter(|value| !value.is_null())
            .ok_or_else(|| InputError::new(stage, "final_product_summaries"))
    }
}

fn decode<T: DeserializeOwned>(field: &str, value: &Value) -> Result<T, ParseError> {
    serde_json::from_value(value.clone()).map_err(|err| {
        ParseError::new(
            format!("unexpected shape for '{field}': {err}"),
            &value.to_string(),
        )
    })
}
