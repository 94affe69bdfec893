//! Run, search, and date-window configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::RefreshMode;

/// Default file name for the persisted cache snapshot.
pub const DEFAULT_CACHE_FILE: &str = "trend_cache.json";

/// Default in-flight limit for the product-extraction fan-out.
pub const DEFAULT_EXTRACT_CONCURRENCY: usize = 3;

/// Default in-flight limit for the product-summary fan-out.
pub const DEFAULT_SUMMARIZE_CONCURRENCY: usize = 2;

/// The retail categories tracked out of the box.
#[must_use]
pub fn default_categories() -> &'static [&'static str] {
    &[
        "Energy Drinks",
        "Salty Snacks",
        "Cigarettes",
        "Beer",
        "Wine",
        "Flavour and sparkling water",
        "Carbonated Drinks",
    ]
}

/// Inclusive date window a run is scoped to.
///
/// The window is part of every cache key, so two runs over different windows
/// never share memoized results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window.
    pub end: NaiveDate,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

impl DateWindow {
    /// Creates a new date window.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parses a window from `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: NaiveDate::parse_from_str(start, DATE_FORMAT)?,
            end: NaiveDate::parse_from_str(end, DATE_FORMAT)?,
        })
    }

    /// The start date as `YYYY-MM-DD`.
    #[must_use]
    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// The end date as `YYYY-MM-DD`.
    #[must_use]
    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// Human-readable label used in logs and error context.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.start_str(), self.end_str())
    }
}

/// Parameters forwarded to the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search depth requested from the provider.
    pub search_depth: String,
    /// Maximum number of results per query.
    pub max_results: u32,
    /// Relative time range hint.
    pub time_range: String,
    /// Raw-content mode requested per result.
    pub include_raw_content: String,
    /// Content chunks per source document.
    pub chunks_per_source: u32,
    /// Country bias for the search.
    pub country: String,
    /// Answer-synthesis mode requested from the provider.
    pub include_answer: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_depth: "advanced".to_string(),
            max_results: 10,
            time_range: "year".to_string(),
            include_raw_content: "text".to_string(),
            chunks_per_source: 5,
            country: "united states".to_string(),
            include_answer: "advanced".to_string(),
        }
    }
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The date window the run (and its cache keys) are scoped to.
    pub window: DateWindow,
    /// In-flight limit for the extraction fan-out.
    pub extract_concurrency: usize,
    /// In-flight limit for the summarization fan-out.
    pub summarize_concurrency: usize,
    /// Whether cached stage results may be returned directly.
    pub refresh: RefreshMode,
    /// Parameters for the search provider.
    pub search: SearchConfig,
}

impl RunConfig {
    /// Creates a run configuration with default limits for the given window.
    #[must_use]
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            extract_concurrency: DEFAULT_EXTRACT_CONCURRENCY,
            summarize_concurrency: DEFAULT_SUMMARIZE_CONCURRENCY,
            refresh: RefreshMode::default(),
            search: SearchConfig::default(),
        }
    }

    /// Sets the extraction fan-out limit.
    #[must_use]
    pub fn with_extract_concurrency(mut self, limit: usize) -> Self {
        self.extract_concurrency = limit;
        self
    }

    /// Sets the summarization fan-out limit.
    #[must_use]
    pub fn with_summarize_concurrency(mut self, limit: usize) -> Self {
        self.summarize_concurrency = limit;
        self
    }

    /// Sets the refresh mode.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshMode) -> Self {
        self.refresh = refresh;
        self
    }

    /// Sets the search parameters.
    #[must_use]
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }
}
