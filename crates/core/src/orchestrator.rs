//! Search orchestration: owns the current query and filters, debounces input,
//! runs searches against the API, applies client-side sort, and records
//! history.
//!
//! Every input change bumps a generation counter and schedules a delayed fire.
//! A fire only runs if its generation is still the latest when the delay
//! elapses. A result is applied unless a newer search has started or is still
//! scheduled, so cancelling the only newer arm lets the in-flight search
//! settle. A scheduled fire that is still waiting is aborted when superseded;
//! one that already fired is left to finish and its result is dropped.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{build_search_params, SearchApi};
use crate::config::SearchConfig;
use crate::error::StoreError;
use crate::filters::{filter_display_text, has_active_filters};
use crate::history::HistoryStore;
use crate::preferences::PreferenceStore;
use crate::sort::apply_client_sort;
use crate::types::{RecentSearch, SavedSearch, SearchFilters, SearchParams, ServiceProvider};

// ---------------------------------------------------------------------------
// Observable state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
    /// No query and no active filters; results hold the featured listing.
    Idle,
    /// A search was triggered and its result has not arrived yet.
    Pending,
    /// Results, an empty result, or an error notice are showing.
    Settled,
}

/// Everything a screen needs to render the search view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot {
    pub phase: SearchPhase,
    pub query: String,
    pub filters: SearchFilters,
    pub results: Vec<ServiceProvider>,
    pub total_count: u64,
    pub page: u32,
    pub total_pages: u32,
    /// User-facing message when the last search failed.
    pub notice: Option<String>,
    /// Generation of the search that produced `results`.
    pub generation: u64,
}

impl Default for SearchSnapshot {
    fn default() -> Self {
        Self {
            phase: SearchPhase::Idle,
            query: String::new(),
            filters: SearchFilters::default(),
            results: Vec::new(),
            total_count: 0,
            page: 0,
            total_pages: 0,
            notice: None,
            generation: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ScheduledFire {
    generation: u64,
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl ScheduledFire {
    /// Abort only while still waiting out the debounce window. Returns
    /// whether the fire was aborted.
    fn cancel(self) -> bool {
        if self.fired.load(Ordering::SeqCst) {
            return false;
        }
        self.handle.abort();
        true
    }
}

/// Parameters of the search currently shown, for paging.
struct ExecutedSearch {
    generation: u64,
    params: SearchParams,
    filters: SearchFilters,
}

struct Inner {
    history: HistoryStore,
    preferences: PreferenceStore,
    api: Arc<dyn SearchApi>,
    config: SearchConfig,
    generation: AtomicU64,
    /// Newest generation whose search has begun.
    started: AtomicU64,
    /// Searches awaiting the API. Only changed while `pending` is locked.
    in_flight: AtomicUsize,
    pending: Mutex<Option<ScheduledFire>>,
    executed: Mutex<Option<ExecutedSearch>>,
    state: watch::Sender<SearchSnapshot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// No newer search has begun and none is waiting to fire.
    fn is_latest_search(&self, generation: u64) -> bool {
        let pending = lock(&self.pending);
        self.is_latest_given(&pending, generation)
    }

    fn is_latest_given(&self, pending: &Option<ScheduledFire>, generation: u64) -> bool {
        self.started.load(Ordering::SeqCst) <= generation
            && pending.as_ref().map_or(true, |fire| fire.generation <= generation)
    }

    fn begin_search(&self) {
        let _pending = lock(&self.pending);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark a search as returned and report whether its result should be
    /// applied. Runs under the `pending` lock so it orders against
    /// [`SearchOrchestrator::cancel_pending`].
    fn finish_search(&self, generation: u64) -> bool {
        let pending = lock(&self.pending);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.is_latest_given(&pending, generation)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn cancel_pending(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.cancel();
        }
    }

    fn is_searchable(&self, query: &str, filters: &SearchFilters) -> bool {
        query.trim().chars().count() >= self.config.min_query_len || has_active_filters(filters)
    }

    /// Run the search for the current query and filters as generation `generation`.
    async fn execute(self: &Arc<Self>, generation: u64, record_history: bool) {
        self.started.fetch_max(generation, Ordering::SeqCst);
        let (query, filters) = {
            let state = self.state.borrow();
            (state.query.clone(), state.filters.clone())
        };

        if !self.is_searchable(&query, &filters) {
            self.load_featured(generation).await;
            return;
        }

        self.state.send_modify(|s| {
            s.phase = SearchPhase::Pending;
            s.notice = None;
        });

        let query = query.trim();
        if record_history {
            self.history.add_recent_search(query, &filters).await;
        }

        let params = build_search_params(query, &filters, 1, self.config.page_size);
        debug!(generation, query, "Searching providers");
        self.begin_search();
        let result = self.api.search(&params).await;

        if !self.finish_search(generation) {
            debug!(generation, "Discarding superseded search result");
            return;
        }

        match result {
            Ok(page) => {
                let mut results = page.data;
                apply_client_sort(&mut results, &filters);
                info!(generation, results = results.len(), total = page.total_count, "Search settled");
                self.state.send_modify(|s| {
                    s.phase = SearchPhase::Settled;
                    s.results = results;
                    s.total_count = page.total_count;
                    s.page = page.page_number.max(1);
                    s.total_pages = page.total_pages;
                    s.notice = None;
                    s.generation = generation;
                });
                *lock(&self.executed) = Some(ExecutedSearch { generation, params, filters });
            }
            Err(e) => {
                warn!(generation, error = %e, "Search failed");
                let notice = e.user_notice();
                self.state.send_modify(|s| {
                    s.phase = SearchPhase::Settled;
                    s.results.clear();
                    s.total_count = 0;
                    s.page = 0;
                    s.total_pages = 0;
                    s.notice = Some(notice);
                    s.generation = generation;
                });
                *lock(&self.executed) = None;
            }
        }
    }

    async fn load_featured(self: &Arc<Self>, generation: u64) {
        debug!(generation, "Loading featured providers");
        self.begin_search();
        let result = self.api.featured(self.config.featured_page_size).await;
        if !self.finish_search(generation) {
            return;
        }

        *lock(&self.executed) = None;
        match result {
            Ok(page) => self.state.send_modify(|s| {
                s.phase = SearchPhase::Idle;
                s.results = page.data;
                s.total_count = page.total_count;
                s.page = page.page_number.max(1);
                s.total_pages = page.total_pages;
                s.notice = None;
                s.generation = generation;
            }),
            Err(e) => {
                warn!(generation, error = %e, "Could not load featured providers");
                let notice = e.user_notice();
                self.state.send_modify(|s| {
                    s.phase = SearchPhase::Idle;
                    s.results.clear();
                    s.total_count = 0;
                    s.page = 0;
                    s.total_pages = 0;
                    s.notice = Some(notice);
                    s.generation = generation;
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

impl SearchOrchestrator {
    pub fn new(
        history: HistoryStore,
        preferences: PreferenceStore,
        api: Arc<dyn SearchApi>,
        config: SearchConfig,
    ) -> Self {
        let (state, _) = watch::channel(SearchSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                history,
                preferences,
                api,
                config,
                generation: AtomicU64::new(0),
                started: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                pending: Mutex::new(None),
                executed: Mutex::new(None),
                state,
            }),
        }
    }

    /// Load the saved default filters and show the first screen. Searches run
    /// from saved defaults are not recorded as recent searches.
    pub async fn start(&self) {
        let defaults = self.inner.preferences.search_preferences().await;
        if has_active_filters(&defaults) {
            debug!(chips = ?filter_display_text(&defaults), "Starting with saved default filters");
        }
        self.inner.state.send_modify(|s| s.filters = defaults);

        self.inner.cancel_pending();
        let generation = self.inner.next_generation();
        self.inner.execute(generation, false).await;
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.inner.state.send_modify(|s| s.query = query);
        self.schedule();
    }

    pub fn set_filters(&self, filters: SearchFilters) {
        self.inner.state.send_modify(|s| s.filters = filters);
        self.schedule();
    }

    pub fn update_filters(&self, update: impl FnOnce(&mut SearchFilters)) {
        self.inner.state.send_modify(|s| update(&mut s.filters));
        self.schedule();
    }

    pub fn clear_filters(&self) {
        self.set_filters(SearchFilters::default());
    }

    /// Arm the debounce timer for the current input, superseding any earlier arm.
    fn schedule(&self) {
        let generation = self.inner.next_generation();
        let fired = Arc::new(AtomicBool::new(false));
        let delay = self.inner.config.debounce();

        let inner = Arc::clone(&self.inner);
        let flag = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            if !inner.is_current(generation) {
                return;
            }
            inner.execute(generation, true).await;
        });

        let previous = lock(&self.inner.pending).replace(ScheduledFire { generation, handle, fired });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Run the current search now, skipping the debounce window.
    pub async fn submit(&self) {
        self.inner.cancel_pending();
        let generation = self.inner.next_generation();
        self.inner.execute(generation, true).await;
    }

    /// Drop any scheduled fire that has not started yet. A search already in
    /// flight still settles with its own result; with nothing in flight a
    /// `Pending` session settles on the results it already shows.
    pub fn cancel_pending(&self) {
        let settle = {
            let mut pending = lock(&self.inner.pending);
            let aborted = pending.take().is_some_and(ScheduledFire::cancel);
            aborted && self.inner.in_flight.load(Ordering::SeqCst) == 0
        };
        if settle {
            self.inner.state.send_if_modified(|s| {
                if s.phase != SearchPhase::Pending {
                    return false;
                }
                debug!(generation = s.generation, "Pending search cancelled, settling");
                s.phase = SearchPhase::Settled;
                true
            });
        }
    }

    pub async fn apply_recent_search(&self, recent: &RecentSearch) {
        self.replace_and_submit(&recent.query, &recent.filters).await;
    }

    pub async fn apply_saved_search(&self, saved: &SavedSearch) {
        self.replace_and_submit(&saved.query, &saved.filters).await;
    }

    async fn replace_and_submit(&self, query: &str, filters: &SearchFilters) {
        self.inner.state.send_modify(|s| {
            s.query = query.to_string();
            s.filters = filters.clone();
        });
        self.submit().await;
    }

    /// Fetch the next page of the settled search and append it.
    pub async fn load_more(&self) {
        let (generation, params, filters) = {
            let state = self.inner.state.borrow();
            if state.phase != SearchPhase::Settled || state.page >= state.total_pages {
                return;
            }
            let executed = lock(&self.inner.executed);
            let Some(executed) = executed.as_ref() else {
                return;
            };
            if executed.generation != state.generation {
                return;
            }
            let params = SearchParams { page: state.page + 1, ..executed.params.clone() };
            (executed.generation, params, executed.filters.clone())
        };

        debug!(generation, page = params.page, "Loading next page");
        let result = self.inner.api.search(&params).await;
        if !self.inner.is_latest_search(generation) {
            return;
        }

        match result {
            Ok(page) => self.inner.state.send_modify(|s| {
                s.results.extend(page.data);
                apply_client_sort(&mut s.results, &filters);
                s.page = page.page_number.max(params.page);
                s.total_pages = page.total_pages;
                s.total_count = page.total_count;
                s.notice = None;
            }),
            Err(e) => {
                warn!(generation, page = params.page, error = %e, "Could not load next page");
                let notice = e.user_notice();
                self.inner.state.send_modify(|s| s.notice = Some(notice));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Explicit saves
    // -----------------------------------------------------------------------

    pub async fn save_current_search(&self, name: &str) -> Result<SavedSearch, StoreError> {
        let (query, filters) = {
            let state = self.inner.state.borrow();
            (state.query.trim().to_string(), state.filters.clone())
        };
        self.inner.history.save_search(name, &query, &filters).await
    }

    pub async fn save_current_filters_as_default(&self) -> Result<(), StoreError> {
        let filters = self.inner.state.borrow().filters.clone();
        self.inner.preferences.save_search_preferences(&filters).await
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn has_active_filters(&self) -> bool {
        has_active_filters(&self.inner.state.borrow().filters)
    }

    pub fn filter_chips(&self) -> Vec<String> {
        filter_display_text(&self.inner.state.borrow().filters)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.inner.history
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.inner.preferences
    }

    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }
}
