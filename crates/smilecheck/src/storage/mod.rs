//! Key-value persistence backends.
//!
//! The record store persists its state as named JSON blobs ("slots"). This
//! module defines the [`KeyValueStore`] seam and two backends: an in-process
//! [`MemoryStore`] and the `SQLite`-backed [`SqliteStore`].

pub mod migrations;
pub mod schema;
mod sqlite;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

pub use sqlite::SqliteStore;

/// A durable string-to-string slot store.
pub trait KeyValueStore: fmt::Debug + Send {
    /// Read a slot. Returns `None` if the slot has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a slot, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Write several slots together.
    ///
    /// Backends that support it apply all entries atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any slot cannot be written.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Human-readable description of where the slots live.
    fn location(&self) -> String;
}

/// An in-process slot store.
///
/// Clones share the same slots, so a test can keep a handle to inspect or
/// reopen what a [`RecordStore`](crate::store::RecordStore) wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with slots.
    #[must_use]
    pub fn with_slots<K, V>(slots: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let slots = slots
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            slots: Arc::new(Mutex::new(slots)),
        }
    }

    /// Number of slots written.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot map is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Check if no slot has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot map is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        let mut slots = self.lock()?;
        for (key, value) in entries {
            slots.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn location(&self) -> String {
        ":memory:".to_string()
    }
}
