//! In-memory mirror backend.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{MirrorBackend, MirrorError};

/// Mirror backend that keeps entries in process memory.
///
/// Used for tests and for runs that should not leave files behind.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMirror {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MirrorBackend for MemoryMirror {
    fn get(&self, key: &str) -> Result<Option<String>, MirrorError> {
        let entries = self.entries.lock().map_err(|_| MirrorError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        let mut entries = self.entries.lock().map_err(|_| MirrorError::Poisoned)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        let mut entries = self.entries.lock().map_err(|_| MirrorError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
