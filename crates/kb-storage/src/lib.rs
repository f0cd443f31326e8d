//! Knowledge Base Storage Library
//!
//! Key-value storage used to persist the bearer token: the `KeyValueStore` trait,
//! a durable local-filesystem backend and an in-memory backend for tests.

pub mod factory;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
pub use kb_core::TokenBackend;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StorageError, StorageResult};
