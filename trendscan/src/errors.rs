//! Error types for the trendscan pipeline.
//!
//! The taxonomy separates caller mistakes (missing state fields) from
//! external-provider failures, model-output parse failures, and cache
//! persistence failures, because each class has a different recovery policy.

use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum TrendscanError {
    /// A required pipeline-state field or run parameter was missing.
    #[error("{0}")]
    Input(#[from] InputError),

    /// An external model or search call failed.
    #[error("{0}")]
    Task(#[from] TaskError),

    /// Model output could not be interpreted as structured data.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// The cache store could not be persisted.
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// A stage failed, annotated with the run context it failed in.
    #[error("stage '{stage}' failed for category '{category}' ({window}): {source}")]
    Stage {
        /// The failing stage's name.
        stage: String,
        /// The category the run was scoped to.
        category: String,
        /// The date window the run was scoped to.
        window: String,
        /// The underlying failure.
        #[source]
        source: Box<TrendscanError>,
    },
}

impl TrendscanError {
    /// Wraps an error with the stage and run context it occurred in.
    #[must_use]
    pub fn for_stage(
        stage: impl Into<String>,
        category: impl Into<String>,
        window: impl Into<String>,
        source: TrendscanError,
    ) -> Self {
        Self::Stage {
            stage: stage.into(),
            category: category.into(),
            window: window.into(),
            source: Box::new(source),
        }
    }
}

/// Error raised when a stage's required input is absent from the state.
#[derive(Debug, Clone, Error)]
#[error("stage '{stage}' requires '{field}' but it is missing")]
pub struct InputError {
    /// The stage (or entry point) that needed the field.
    pub stage: String,
    /// The missing field.
    pub field: String,
}

impl InputError {
    /// Creates a new input error.
    #[must_use]
    pub fn new(stage: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            field: field.into(),
        }
    }
}

/// Errors from the external task and search capabilities.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The generative-model call failed.
    #[error("model call failed: {reason}")]
    Model {
        /// The reason for failure.
        reason: String,
    },

    /// The search-provider call failed.
    #[error("search call failed: {reason}")]
    Search {
        /// The reason for failure.
        reason: String,
    },

    /// The provider answered, but with nothing usable.
    #[error("provider returned no usable content: {context}")]
    EmptyOutput {
        /// What was being asked for.
        context: String,
    },
}

impl TaskError {
    /// Creates a model-call failure.
    #[must_use]
    pub fn model(reason: impl Into<String>) -> Self {
        Self::Model {
            reason: reason.into(),
        }
    }

    /// Creates a search-call failure.
    #[must_use]
    pub fn search(reason: impl Into<String>) -> Self {
        Self::Search {
            reason: reason.into(),
        }
    }

    /// Creates an empty-output failure.
    #[must_use]
    pub fn empty_output(context: impl Into<String>) -> Self {
        Self::EmptyOutput {
            context: context.into(),
        }
    }
}

/// Error raised when text could not be parsed as structured data.
///
/// Callers recover from this by substituting the raw text, so it surfaces
/// only when a structured shape was mandatory (e.g. a cached stage update).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    /// What failed to parse.
    pub message: String,
    /// The offending text, truncated.
    pub snippet: String,
}

const SNIPPET_LIMIT: usize = 200;

impl ParseError {
    /// Creates a new parse error, keeping only the head of the input text.
    #[must_use]
    pub fn new(message: impl Into<String>, text: &str) -> Self {
        let snippet = if text.len() > SNIPPET_LIMIT {
            let mut end = SNIPPET_LIMIT;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text[..end].to_string()
        } else {
            text.to_string()
        };
        Self {
            message: message.into(),
            snippet,
        }
    }
}

/// Errors from the persistent cache store.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The persisted snapshot could not be read or decoded.
    ///
    /// Reads recover from this by treating the store as empty; the variant
    /// exists so the degradation is observable, not silent.
    #[error("cache snapshot at '{path}' is unreadable: {reason}")]
    Unreadable {
        /// Path of the snapshot file.
        path: String,
        /// The underlying I/O or decode failure.
        reason: String,
    },

    /// Writing the snapshot failed. Never swallowed: a lost write would
    /// mask cost already spent computing the entry.
    #[error("cache write to '{path}' failed: {reason}")]
    Write {
        /// Path being written.
        path: String,
        /// The underlying I/O failure.
        reason: String,
    },

    /// The snapshot could not be serialized.
    #[error("cache snapshot could not be serialized: {reason}")]
    Serialize {
        /// The underlying serializer failure.
        reason: String,
    },
}

impl CacheError {
    /// Creates an unreadable-snapshot error.
    #[must_use]
    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a write-failure error.
    #[must_use]
    pub fn write(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a serialization-failure error.
    #[must_use]
    pub fn serialize(reason: impl Into<String>) -> Self {
        Self::Serialize {
            reason: reason.into(),
        }
    }
}
