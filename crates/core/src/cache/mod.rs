//! Parse cache keyed by file modification time

pub mod store;
pub mod table;

// Re-export the main cache types
pub use store::{CACHE_FILE, CacheStore, FlusherHandle};
pub use table::{CacheEntry, CacheTable, FORMAT_VERSION};
