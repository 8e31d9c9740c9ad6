//! Shared, build-once hierarchy cache

pub mod hierarchy_cache;

pub use hierarchy_cache::{CacheResult, CacheStats, HierarchyCache};
