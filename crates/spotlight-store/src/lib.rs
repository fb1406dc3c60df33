//! `spotlight-store` – persisted view sequences.
//!
//! One [`SequenceStore`] per configured database name; [`SequenceStores`]
//! resolves the `:db` segment of a request to the right one.

pub mod sequences;

pub use sequences::{Sequence, SequenceState, SequenceStore, StoreError};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Database name → shared store.
#[derive(Default, Clone)]
pub struct SequenceStores {
    stores: HashMap<String, Arc<Mutex<SequenceStore>>>,
}

impl SequenceStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, db: impl Into<String>, store: SequenceStore) {
        self.stores.insert(db.into(), Arc::new(Mutex::new(store)));
    }

    /// # Errors
    ///
    /// [`StoreError::UnknownDatabase`] when `db` was never inserted.
    pub fn get(&self, db: &str) -> Result<Arc<Mutex<SequenceStore>>, StoreError> {
        self.stores
            .get(db)
            .cloned()
            .ok_or_else(|| StoreError::UnknownDatabase(db.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
