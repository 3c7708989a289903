//! Storage Module
//!
//! Per-database key/value state for the server: a fixed number of isolated
//! namespaces with primitive select/set/get/delete/enumerate operations.
//!
//! ## Example
//!
//! ```
//! use linekv::storage::Store;
//!
//! let mut store = Store::new(16);
//! store.set(0, "name", "linekv");
//! assert_eq!(store.get(0, "name"), Some("linekv".to_string()));
//! assert_eq!(store.get(1, "name"), None);
//! ```

pub mod store;

// Re-export commonly used types
pub use store::{Store, DEFAULT_DB_COUNT};
