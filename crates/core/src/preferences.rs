//! The user's default filter set.

use std::sync::Arc;
use tracing::debug;

use crate::error::StoreError;
use crate::storage::{load_or_default, store_json, KeyValueStore, StoreKey, WriteQueue};
use crate::types::SearchFilters;

#[derive(Clone)]
pub struct PreferenceStore {
    store: Arc<dyn KeyValueStore>,
    writes: Arc<WriteQueue>,
}

impl PreferenceStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_queue(store, Arc::new(WriteQueue::new()))
    }

    /// Share `writes` with other stores over the same backing store.
    pub fn with_queue(store: Arc<dyn KeyValueStore>, writes: Arc<WriteQueue>) -> Self {
        Self { store, writes }
    }

    /// Saved defaults, or no constraints when nothing usable is stored.
    pub async fn search_preferences(&self) -> SearchFilters {
        load_or_default(self.store.as_ref(), StoreKey::SearchPreferences).await
    }

    pub async fn save_search_preferences(&self, filters: &SearchFilters) -> Result<(), StoreError> {
        let _guard = self.writes.acquire(StoreKey::SearchPreferences).await;
        store_json(self.store.as_ref(), StoreKey::SearchPreferences, filters).await?;
        debug!("Saved search preferences");
        Ok(())
    }

    pub async fn reset_search_preferences(&self) -> Result<(), StoreError> {
        let _guard = self.writes.acquire(StoreKey::SearchPreferences).await;
        self.store.remove(StoreKey::SearchPreferences.as_str()).await
    }
}
