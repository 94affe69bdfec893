//! Cache-aside memoization for stage work functions.
//!
//! A memoized invocation never re-runs work that already has a cached
//! result, and when fresh work fails it degrades to the last known-good
//! result instead of failing the run, provided one exists. Each invocation
//! can cost real money and minutes, so both properties matter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::key::{derive_key, CacheKey};
use super::store::CacheStore;
use crate::config::DateWindow;
use crate::errors::{InputError, TrendscanError};

/// Field added to a stale cached value returned in place of a failed fresh
/// computation.
pub const STALE_ERROR_FIELD: &str = "_stage_error";

/// Whether a memoized invocation may return a cached value directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Return the cached value on a hit without invoking the work function.
    #[default]
    UseCache,
    /// Always invoke the work function; the cached value stays available as
    /// the stale fallback.
    Refresh,
}

/// Logical parameters identifying one memoized invocation.
#[derive(Debug, Clone, Copy)]
pub struct MemoScope<'a> {
    /// The category the run is scoped to.
    pub category: &'a str,
    /// The date window the run is scoped to.
    pub window: DateWindow,
}

impl<'a> MemoScope<'a> {
    /// Creates a new scope.
    #[must_use]
    pub fn new(category: &'a str, window: DateWindow) -> Self {
        Self { category, window }
    }

    /// Derives the cache key for a stage within this scope.
    #[must_use]
    pub fn key_for(&self, stage: &str) -> CacheKey {
        derive_key(
            stage,
            self.category,
            &self.window.start_str(),
            &self.window.end_str(),
        )
    }

    fn validate(&self, stage: &str) -> Result<(), InputError> {
        if self.category.trim().is_empty() {
            return Err(InputError::new(stage, "category"));
        }
        Ok(())
    }
}

/// Wraps stage work functions with cache-aside semantics and stale-on-error
/// fallback.
pub struct Memoizer {
    store: Arc<dyn CacheStore>,
}

impl Memoizer {
    /// Creates a memoizer over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Runs `work` with cache-aside memoization.
    ///
    /// On a cache hit the stored value is returned and `work` is not invoked
    /// at all. On a miss, `work` runs; success is persisted and returned,
    /// failure falls back to the previously cached value (annotated under
    /// [`STALE_ERROR_FIELD`]) when one exists, and propagates otherwise.
    pub async fn run<F, Fut>(
        &self,
        stage: &str,
        scope: &MemoScope<'_>,
        work: F,
    ) -> Result<Value, TrendscanError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, TrendscanError>> + Send,
    {
        self.run_mode(stage, scope, RefreshMode::UseCache, work).await
    }

    /// Like [`Memoizer::run`], with an explicit refresh mode.
    ///
    /// The cached value is snapshotted before anything else, so the fallback
    /// path has the correct candidate even when [`RefreshMode::Refresh`]
    /// forces re-execution past a hit.
    pub async fn run_mode<F, Fut>(
        &self,
        stage: &str,
        scope: &MemoScope<'_>,
        mode: RefreshMode,
        work: F,
    ) -> Result<Value, TrendscanError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, TrendscanError>> + Send,
    {
        scope.validate(stage)?;
        let key = scope.key_for(stage);
        let window = scope.window.label();

        let prior = self.store.get(&key).await?;
        if mode == RefreshMode::UseCache {
            if let Some(cached) = &prior {
                tracing::info!(stage, category = scope.category, window = %window, "cache hit");
                return Ok(cached.clone());
            }
        }
        tracing::info!(stage, category = scope.category, window = %window, "cache miss");

        match work().await {
            Ok(value) => {
                self.store.put(&key, value.clone()).await?;
                tracing::info!(stage, category = scope.category, window = %window, "cache save");
                Ok(value)
            }
            Err(err) => match prior {
                Some(stale) => {
                    tracing::warn!(
                        stage,
                        category = scope.category,
                        error = %err,
                        "stage failed, returning previous cached output"
                    );
                    Ok(annotate_stale(stale, &err))
                }
                None => Err(err),
            },
        }
    }
}

impl std::fmt::Debug for Memoizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoizer").finish_non_exhaustive()
    }
}

fn annotate_stale(value: Value, err: &TrendscanError) -> Value {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            let mut fields = serde_json::Map::new();
            fields.insert("value".to_string(), other);
            fields
        }
    };
    fields.insert(STALE_ERROR_FIELD.to_string(), Value::String(err.to_string()));
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryStore;
    use crate::errors::TaskError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scope(window: &DateWindow) -> MemoScope<'_> {
        MemoScope::new("Energy Drinks", *window)
    }

    fn window() -> DateWindow {
        DateWindow::parse("2025-01-01", "2025-01-31").unwrap()
    }

    #[tokio::test]
    async fn test_hit_skips_work() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = scope(&window);
        let memo = Memoizer::new(store.clone());

        store
            .put(&scope.key_for("generate_query"), json!({"search_query": "q"}))
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let result = memo
            .run("generate_query", &scope, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!({"search_query": "fresh"})) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result, json!({"search_query": "q"}));
    }

    #[tokio::test]
    async fn test_miss_executes_and_saves() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = scope(&window);
        let memo = Memoizer::new(store.clone());

        let result = memo
            .run("web_search", &scope, || async {
                Ok(json!({"search_results": []}))
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"search_results": []}));
        assert_eq!(
            store.get(&scope.key_for("web_search")).await.unwrap(),
            Some(json!({"search_results": []}))
        );
    }

    #[tokio::test]
    async fn test_stale_fallback_on_forced_refresh_failure() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = scope(&window);
        let memo = Memoizer::new(store.clone());
        let key = scope.key_for("clean_products");

        store.put(&key, json!({"final_product_summaries": ["a"]})).await.unwrap();

        let result = memo
            .run_mode("clean_products", &scope, RefreshMode::Refresh, || async {
                Err(TaskError::model("provider down").into())
            })
            .await
            .unwrap();

        let fields = result.as_object().unwrap();
        assert_eq!(fields["final_product_summaries"], json!(["a"]));
        assert!(fields[STALE_ERROR_FIELD]
            .as_str()
            .unwrap()
            .contains("provider down"));

        // The failure must not overwrite the cached value.
        assert_eq!(
            store.get(&key).await.unwrap(),
            Some(json!({"final_product_summaries": ["a"]}))
        );
    }

    #[tokio::test]
    async fn test_non_object_stale_value_is_wrapped() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = scope(&window);
        let memo = Memoizer::new(store.clone());
        let key = scope.key_for("generate_query");

        store.put(&key, json!("just a string")).await.unwrap();

        let result = memo
            .run_mode("generate_query", &scope, RefreshMode::Refresh, || async {
                Err(TaskError::model("boom").into())
            })
            .await
            .unwrap();

        assert_eq!(result["value"], json!("just a string"));
        assert!(result[STALE_ERROR_FIELD].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_failure_without_prior_propagates() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = scope(&window);
        let memo = Memoizer::new(store.clone());

        let result = memo
            .run("extract_products", &scope, || async {
                Err(TaskError::model("first attempt failed").into())
            })
            .await;

        assert!(matches!(result, Err(TrendscanError::Task(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_overwrites_on_success() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = scope(&window);
        let memo = Memoizer::new(store.clone());
        let key = scope.key_for("web_search");

        store.put(&key, json!({"old": true})).await.unwrap();

        let result = memo
            .run_mode("web_search", &scope, RefreshMode::Refresh, || async {
                Ok(json!({"new": true}))
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"new": true}));
        assert_eq!(store.get(&key).await.unwrap(), Some(json!({"new": true})));
    }

    #[tokio::test]
    async fn test_empty_category_is_an_input_error() {
        let store = Arc::new(InMemoryStore::new());
        let window = window();
        let scope = MemoScope::new("  ", window);
        let memo = Memoizer::new(store);

        let result = memo
            .run("generate_query", &scope, || async { Ok(json!({})) })
            .await;

        assert!(matches!(result, Err(TrendscanError::Input(_))));
    }
}
