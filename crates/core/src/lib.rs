//! Glowbook search: client-side search state and history for the booking app.
//!
//! The engine keeps the user's query and filter state, debounces searches
//! against the provider API, sorts results on the client, and remembers recent
//! searches, saved searches, and default filters through an injected key-value
//! store.
//!
//! # Modules
//!
//! - [`types`] — Filters, history records, provider results, request parameters
//! - [`filters`] — Active-filter test and summary chips
//! - [`storage`] — Key-value store trait, memory and file stores, per-key write queue
//! - [`history`] — Recent and saved searches
//! - [`preferences`] — Default filter set
//! - [`api`] — Search API trait, request parameter mapping, HTTP client
//! - [`sort`] — Client-side result ordering
//! - [`orchestrator`] — Debounced search session
//! - [`config`] — `.glowbook.toml` loading
//! - [`error`] — Error types

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod history;
pub mod orchestrator;
pub mod preferences;
pub mod sort;
pub mod storage;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

pub use api::{build_search_params, SearchApi};
pub use config::{load_search_config, SearchConfig};
pub use error::{ApiError, ConfigError, StoreError};
pub use filters::{filter_display_text, has_active_filters};
pub use history::HistoryStore;
pub use orchestrator::{SearchOrchestrator, SearchPhase, SearchSnapshot};
pub use preferences::PreferenceStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore, WriteQueue};
pub use types::*;

// ---------------------------------------------------------------------------
// Cross-platform path helpers
// ---------------------------------------------------------------------------

/// Platform-aware home directory: `HOME` on Unix, `USERPROFILE` on Windows.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok().map(PathBuf::from)
}

/// Platform-aware data directory: `$XDG_DATA_HOME/glowbook` or
/// `~/.local/share/glowbook` on Unix, `%LOCALAPPDATA%/glowbook` on Windows.
pub fn data_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        std::env::var("LOCALAPPDATA")
            .or_else(|_| std::env::var("APPDATA"))
            .ok()
            .map(|a| PathBuf::from(a).join("glowbook"))
    } else {
        std::env::var("XDG_DATA_HOME")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join(".local/share")))
            .map(|d| d.join("glowbook"))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Build an orchestrator whose history and preferences share one store and
/// one write queue.
pub fn build_orchestrator(
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn SearchApi>,
    config: SearchConfig,
) -> SearchOrchestrator {
    build_orchestrator_with_queue(store, Arc::new(WriteQueue::new()), api, config)
}

/// Like [`build_orchestrator`], serializing writes through `writes` so other
/// history or preference stores built on the same queue stay consistent.
pub fn build_orchestrator_with_queue(
    store: Arc<dyn KeyValueStore>,
    writes: Arc<WriteQueue>,
    api: Arc<dyn SearchApi>,
    config: SearchConfig,
) -> SearchOrchestrator {
    let history =
        HistoryStore::with_queue(Arc::clone(&store), Arc::clone(&writes), config.recent_limit);
    let preferences = PreferenceStore::with_queue(store, writes);
    SearchOrchestrator::new(history, preferences, api, config)
}
