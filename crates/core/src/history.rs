//! Recent and saved search history.
//!
//! Recent searches are best-effort: reads fall back to an empty list and write
//! failures are logged, never returned. Saved searches are explicit user
//! actions, so saving one reports persistence failures to the caller.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DEFAULT_RECENT_LIMIT;
use crate::error::StoreError;
use crate::filters::has_active_filters;
use crate::storage::{load_or_default, store_json, KeyValueStore, StoreKey, WriteQueue};
use crate::types::{RecentSearch, SavedSearch, SearchFilters};

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    writes: Arc<WriteQueue>,
    recent_limit: usize,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limit(store, DEFAULT_RECENT_LIMIT)
    }

    /// A store with its own write queue. Two `HistoryStore`s built this way
    /// over the same backing store do not serialize against each other; use
    /// [`HistoryStore::with_queue`] to share one.
    pub fn with_limit(store: Arc<dyn KeyValueStore>, recent_limit: usize) -> Self {
        Self::with_queue(store, Arc::new(WriteQueue::new()), recent_limit)
    }

    pub fn with_queue(
        store: Arc<dyn KeyValueStore>,
        writes: Arc<WriteQueue>,
        recent_limit: usize,
    ) -> Self {
        Self { store, writes, recent_limit: recent_limit.max(1) }
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    // -----------------------------------------------------------------------
    // Recent searches
    // -----------------------------------------------------------------------

    /// Recent searches, newest first.
    pub async fn recent_searches(&self) -> Vec<RecentSearch> {
        load_or_default(self.store.as_ref(), StoreKey::RecentSearches).await
    }

    /// Record an executed search at the head of the list.
    ///
    /// An equal `(query, filters)` pair already in the list is replaced rather
    /// than duplicated, and the list is truncated to the configured limit.
    pub async fn add_recent_search(&self, query: &str, filters: &SearchFilters) {
        if query.trim().is_empty() && !has_active_filters(filters) {
            return;
        }

        let _guard = self.writes.acquire(StoreKey::RecentSearches).await;
        let mut recent: Vec<RecentSearch> =
            load_or_default(self.store.as_ref(), StoreKey::RecentSearches).await;

        recent.retain(|entry| !entry.matches(query, filters));
        recent.insert(
            0,
            RecentSearch {
                query: query.to_string(),
                filters: filters.clone(),
                timestamp: Utc::now(),
            },
        );
        recent.truncate(self.recent_limit);

        match store_json(self.store.as_ref(), StoreKey::RecentSearches, &recent).await {
            Ok(()) => debug!(query, entries = recent.len(), "Recorded recent search"),
            Err(e) => warn!(query, error = %e, "Could not record recent search"),
        }
    }

    pub async fn clear_recent_searches(&self) {
        let _guard = self.writes.acquire(StoreKey::RecentSearches).await;
        if let Err(e) = self.store.remove(StoreKey::RecentSearches.as_str()).await {
            warn!(error = %e, "Could not clear recent searches");
        }
    }

    // -----------------------------------------------------------------------
    // Saved searches
    // -----------------------------------------------------------------------

    /// Saved searches, newest first.
    pub async fn saved_searches(&self) -> Vec<SavedSearch> {
        load_or_default(self.store.as_ref(), StoreKey::SavedSearches).await
    }

    pub async fn find_saved_search(&self, id: &str) -> Option<SavedSearch> {
        self.saved_searches().await.into_iter().find(|s| s.id == id)
    }

    /// Persist a named search and return the stored record.
    pub async fn save_search(
        &self,
        name: &str,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SavedSearch, StoreError> {
        let _guard = self.writes.acquire(StoreKey::SavedSearches).await;
        let mut saved: Vec<SavedSearch> =
            load_or_default(self.store.as_ref(), StoreKey::SavedSearches).await;

        let record = SavedSearch {
            id: Uuid::now_v7().to_string(),
            name: name.trim().to_string(),
            query: query.to_string(),
            filters: filters.clone(),
            created_at: Utc::now(),
        };
        saved.insert(0, record.clone());

        store_json(self.store.as_ref(), StoreKey::SavedSearches, &saved).await?;
        debug!(id = %record.id, name = %record.name, "Saved search");
        Ok(record)
    }

    /// Remove a saved search. Unknown ids are ignored.
    pub async fn delete_saved_search(&self, id: &str) {
        let _guard = self.writes.acquire(StoreKey::SavedSearches).await;
        let mut saved: Vec<SavedSearch> =
            load_or_default(self.store.as_ref(), StoreKey::SavedSearches).await;

        let before = saved.len();
        saved.retain(|s| s.id != id);
        if saved.len() == before {
            debug!(id, "No saved search with this id");
            return;
        }

        if let Err(e) = store_json(self.store.as_ref(), StoreKey::SavedSearches, &saved).await {
            warn!(id, error = %e, "Could not delete saved search");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn history() -> (Arc<MemoryStore>, HistoryStore) {
        let store = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(store.clone());
        (store, history)
    }

    fn hair() -> SearchFilters {
        SearchFilters { category: Some("Hair".into()), ..Default::default() }
    }

    #[tokio::test]
    async fn empty_query_without_filters_is_not_recorded() {
        let (store, history) = history();
        history.add_recent_search("   ", &SearchFilters::default()).await;
        assert!(history.recent_searches().await.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn filters_alone_are_recorded() {
        let (_, history) = history();
        history.add_recent_search("", &hair()).await;
        let recent = history.recent_searches().await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, "");
        assert_eq!(recent[0].filters, hair());
    }

    #[tokio::test]
    async fn duplicate_moves_to_head_with_later_timestamp() {
        let (_, history) = history();
        history.add_recent_search("braids", &hair()).await;
        let first = history.recent_searches().await[0].timestamp;
        history.add_recent_search("nails", &SearchFilters::default()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        history.add_recent_search("braids", &hair()).await;

        let recent = history.recent_searches().await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "braids");
        assert_eq!(recent[1].query, "nails");
        // The head is the fresh record, not the old one moved up
        assert!(recent[0].timestamp > first);
        assert!(recent[0].timestamp > recent[1].timestamp);
        assert_eq!(recent.iter().filter(|r| r.matches("braids", &hair())).count(), 1);
    }

    #[tokio::test]
    async fn same_query_different_filters_are_distinct() {
        let (_, history) = history();
        history.add_recent_search("braids", &hair()).await;
        history.add_recent_search("braids", &SearchFilters::default()).await;
        assert_eq!(history.recent_searches().await.len(), 2);
    }

    #[tokio::test]
    async fn list_is_bounded_to_most_recent() {
        let (_, history) = history();
        for i in 0..15 {
            history.add_recent_search(&format!("query {i}"), &SearchFilters::default()).await;
        }
        let recent = history.recent_searches().await;
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].query, "query 14");
        assert_eq!(recent[9].query, "query 5");
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let (_, history) = history();
        let mut tasks = Vec::new();
        for i in 0..5 {
            let h = history.clone();
            tasks.push(tokio::spawn(async move {
                h.add_recent_search(&format!("q{i}"), &SearchFilters::default()).await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(history.recent_searches().await.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stores_sharing_a_queue_do_not_lose_writes() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let writes = Arc::new(WriteQueue::new());
        let a = HistoryStore::with_queue(Arc::clone(&store), Arc::clone(&writes), 50);
        let b = HistoryStore::with_queue(Arc::clone(&store), writes, 50);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let h = if i % 2 == 0 { a.clone() } else { b.clone() };
            tasks.push(tokio::spawn(async move {
                h.add_recent_search(&format!("q{i}"), &SearchFilters::default()).await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(a.recent_searches().await.len(), 20);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_, history) = history();
        history.add_recent_search("nails", &SearchFilters::default()).await;
        history.clear_recent_searches().await;
        history.clear_recent_searches().await;
        assert!(history.recent_searches().await.is_empty());
    }

    #[tokio::test]
    async fn saved_searches_are_newest_first_with_unique_ids() {
        let (_, history) = history();
        let a = history.save_search("Weekend hair", "braids", &hair()).await.unwrap();
        let b = history.save_search("Nails", "gel", &SearchFilters::default()).await.unwrap();
        assert_ne!(a.id, b.id);

        let saved = history.saved_searches().await;
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0], b);
        assert_eq!(saved[1], a);
        assert_eq!(history.find_saved_search(&a.id).await, Some(a));
    }

    #[tokio::test]
    async fn deleting_unknown_id_leaves_list_unchanged() {
        let (_, history) = history();
        let a = history.save_search("Hair", "braids", &hair()).await.unwrap();
        history.delete_saved_search("does-not-exist").await;
        assert_eq!(history.saved_searches().await, vec![a.clone()]);

        history.delete_saved_search(&a.id).await;
        assert!(history.saved_searches().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_saved_record_reads_empty() {
        let (store, history) = history();
        store.set(StoreKey::SavedSearches.as_str(), "[{\"id\":".into()).await.unwrap();
        assert!(history.saved_searches().await.is_empty());
    }
}
