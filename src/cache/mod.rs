// file: src/cache/mod.rs
// description: result cache module exports
// reference: internal module structure

pub mod persistence;
pub mod store;

pub use persistence::{DiskStore, StoredEntry};
pub use store::{CacheStats, ResultCache};
