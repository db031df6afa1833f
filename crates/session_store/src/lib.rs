//! # Session Store
//!
//! Persists the visitor identity and the active-session pointer behind an
//! injectable key/value backend. Persistence here is best-effort: storage
//! failures degrade to in-memory behavior, they never abort a chat flow.

pub mod error;
pub mod kv;
pub mod store;

// Re-exports
pub use error::StoreError;
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::SessionStore;
