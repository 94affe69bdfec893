//! Cache key derivation, durable storage, and stage memoization.

mod key;
mod memo;
mod store;

pub use key::{derive_key, CacheKey};
pub use memo::{MemoScope, Memoizer, RefreshMode, STALE_ERROR_FIELD};
pub use store::{CacheStore, InMemoryStore, JsonFileStore};
