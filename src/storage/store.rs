//! In-Memory Multi-Database Store
//!
//! The [`Store`] holds a fixed number of independent key/value namespaces,
//! pre-allocated at construction time. It exposes only primitive,
//! non-composable operations; all policy (counters, transactions, dump
//! formatting) lives in the execution engine.
//!
//! The store carries no lock of its own. The engine that owns it serializes
//! every mutation, so plain `HashMap`s suffice here.

use crate::command::CommandError;
use std::collections::HashMap;

/// The number of databases created when no count is configured.
pub const DEFAULT_DB_COUNT: usize = 16;

/// A fixed set of isolated key/value namespaces, addressed by index.
#[derive(Debug)]
pub struct Store {
    databases: Vec<HashMap<String, String>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_DB_COUNT)
    }
}

impl Store {
    /// Creates a store with `db_count` empty databases. The count is fixed
    /// for the life of the store.
    pub fn new(db_count: usize) -> Self {
        Self {
            databases: (0..db_count).map(|_| HashMap::new()).collect(),
        }
    }

    /// Number of databases this store was created with.
    pub fn db_count(&self) -> usize {
        self.databases.len()
    }

    /// Parses a raw database index and bounds-checks it against the
    /// configured count. Has no side effect on the store.
    pub fn select(&self, raw: &str) -> Result<usize, CommandError> {
        let index: i64 = raw.parse().map_err(|_| CommandError::NotAnInteger)?;
        if index < 0 || index as usize >= self.databases.len() {
            return Err(CommandError::DbIndexOutOfRange);
        }
        Ok(index as usize)
    }

    /// Unconditional upsert; an existing value is overwritten silently.
    pub fn set(&mut self, db: usize, key: impl Into<String>, value: impl Into<String>) {
        self.databases[db].insert(key.into(), value.into());
    }

    /// Pure lookup. Absent is a legitimate non-error outcome, distinct from
    /// any stored value (including the empty string).
    pub fn get(&self, db: usize, key: &str) -> Option<String> {
        self.databases[db].get(key).cloned()
    }

    /// Removes the key if present. Returns 1 if a key was removed, 0
    /// otherwise; the removed value is not returned.
    pub fn delete(&mut self, db: usize, key: &str) -> i64 {
        match self.databases[db].remove(key) {
            Some(_) => 1,
            None => 0,
        }
    }

    /// Iterates over every (key, value) pair in one database. Order is
    /// unspecified but stable within a single call.
    pub fn entries(&self, db: usize) -> impl Iterator<Item = (&str, &str)> {
        self.databases[db]
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
