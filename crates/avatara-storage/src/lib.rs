//! Avatara Storage Library
//!
//! Object-store abstraction and backends for the avatar pipeline.
//!
//! # Storage key format
//!
//! All backends use the same key layout:
//! `avatars/{user_id}/{session_id}/{kind}.{ext}` — see the `keys` module.
//! Keys must not contain `..` or a leading `/`.

pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use local::LocalObjectStore;
pub use memory::{FaultKind, InMemoryObjectStore, PutFault};
pub use traits::{ObjectStore, StorageError, StorageResult};
