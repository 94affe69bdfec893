//! # Trendscan
//!
//! A memoizing multi-stage market-trend research pipeline.
//!
//! A run takes a retail category and a date window, then walks a fixed stage
//! order: generate a search query, search the web, extract product names
//! from each result page, summarize each product, collapse duplicates, and
//! synthesize a final report. Every stage call costs real money and minutes,
//! so every stage result is memoized against its exact parameters:
//!
//! - **Cache-aside stages**: a stage whose result is already cached is not
//!   executed at all.
//! - **Terminal short-circuit**: a run whose final report is already cached
//!   returns immediately without touching any stage.
//! - **Stale-on-error fallback**: a stage that fails degrades to its last
//!   known-good result (annotated with the failure) instead of killing the
//!   run, whenever one exists.
//! - **Bounded fan-out**: per-page sub-tasks run concurrently under a fixed
//!   in-flight limit, with results gathered in input order and failures
//!   isolated per item.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trendscan::prelude::*;
//!
//! let store = Arc::new(JsonFileStore::new("trend_cache.json"));
//! let window = DateWindow::parse("2025-01-01", "2025-01-31")?;
//! let pipeline = Pipeline::standard(task, search, store, RunConfig::new(window));
//!
//! let state = pipeline.run("Energy Drinks").await?;
//! println!("from cache: {}", state.from_cache);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod providers;
pub mod stages;
pub mod state;
pub mod testing;
pub mod text;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{
        derive_key, CacheKey, CacheStore, InMemoryStore, JsonFileStore, MemoScope, Memoizer,
        RefreshMode,
    };
    pub use crate::concurrency::gather_bounded;
    pub use crate::config::{DateWindow, RunConfig, SearchConfig};
    pub use crate::errors::{CacheError, InputError, ParseError, TaskError, TrendscanError};
    pub use crate::pipeline::{Pipeline, RunStatus};
    pub use crate::providers::{
        SearchItem, SearchProvider, SearchResponse, TaskFunction, TaskInput, TaskKind,
    };
    pub use crate::stages::PipelineStage;
    pub use crate::state::{PipelineState, ProductSummary};
}
