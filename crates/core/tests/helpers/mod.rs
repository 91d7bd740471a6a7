//! Test harness for orchestrator integration tests.
//!
//! Wires a `SearchOrchestrator` to an in-memory store and a fake provider API
//! that records every call with the (tokio) time it arrived.

#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use glowbook_core::{
    build_orchestrator, ApiError, KeyValueStore, MemoryStore, PaginatedResponse, SearchApi,
    SearchConfig, SearchOrchestrator, SearchParams, ServiceProvider, StoreError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Fake API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Time since the fake API was created.
    pub at: Duration,
    pub params: SearchParams,
    pub featured: bool,
}

pub struct FakeApi {
    providers: Vec<ServiceProvider>,
    calls: Mutex<Vec<RecordedCall>>,
    failing: AtomicBool,
    latency: Duration,
    created: Instant,
}

impl FakeApi {
    pub fn new(providers: Vec<ServiceProvider>) -> Self {
        Self::with_latency(providers, Duration::ZERO)
    }

    pub fn with_latency(providers: Vec<ServiceProvider>, latency: Duration) -> Self {
        Self {
            providers,
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            latency,
            created: Instant::now(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for real searches (not the featured listing).
    pub fn search_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| !c.featured).collect()
    }

    pub fn featured_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.featured).collect()
    }

    fn matches(provider: &ServiceProvider, params: &SearchParams) -> bool {
        if let Some(q) = &params.query {
            let q = q.to_lowercase();
            let in_name = provider.name.to_lowercase().contains(&q);
            let in_category =
                provider.category.as_deref().is_some_and(|c| c.to_lowercase().contains(&q));
            if !in_name && !in_category {
                return false;
            }
        }
        if let Some(category) = &params.category {
            if provider.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(min) = params.min_rating {
            if provider.rating.unwrap_or(0.0) < min {
                return false;
            }
        }
        true
    }

    async fn respond(
        &self,
        params: &SearchParams,
        featured: bool,
    ) -> Result<PaginatedResponse<ServiceProvider>, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            at: self.created.elapsed(),
            params: params.clone(),
            featured,
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Status { status: 503, body: "unavailable".into() });
        }

        let matching: Vec<ServiceProvider> =
            self.providers.iter().filter(|p| Self::matches(p, params)).cloned().collect();
        let page_size = params.page_size.max(1) as usize;
        let total_pages = matching.len().div_ceil(page_size) as u32;
        let data = matching
            .iter()
            .skip((params.page.max(1) as usize - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        Ok(PaginatedResponse {
            data,
            total_count: matching.len() as u64,
            page_number: params.page,
            page_size: params.page_size,
            total_pages,
        })
    }
}

#[async_trait]
impl SearchApi for FakeApi {
    async fn search(
        &self,
        params: &SearchParams,
    ) -> Result<PaginatedResponse<ServiceProvider>, ApiError> {
        self.respond(params, false).await
    }

    async fn featured(
        &self,
        page_size: u32,
    ) -> Result<PaginatedResponse<ServiceProvider>, ApiError> {
        self.respond(&SearchParams::page(1, page_size), true).await
    }
}

// ---------------------------------------------------------------------------
// Store that refuses writes
// ---------------------------------------------------------------------------

/// Reads succeed (empty), every write fails.
#[derive(Default)]
pub struct ReadOnlyStore;

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("quota exceeded".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub orchestrator: SearchOrchestrator,
    pub api: Arc<FakeApi>,
    pub store: Arc<dyn KeyValueStore>,
}

pub fn test_config() -> SearchConfig {
    SearchConfig { page_size: 5, featured_page_size: 5, ..SearchConfig::default() }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(MemoryStore::new()), FakeApi::new(fixtures::providers()))
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self::with_parts(
            Arc::new(MemoryStore::new()),
            FakeApi::with_latency(fixtures::providers(), latency),
        )
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_parts(store, FakeApi::new(fixtures::providers()))
    }

    pub fn with_parts(store: Arc<dyn KeyValueStore>, api: FakeApi) -> Self {
        let api = Arc::new(api);
        let orchestrator = build_orchestrator(Arc::clone(&store), api.clone(), test_config());
        TestHarness { orchestrator, api, store }
    }
}
