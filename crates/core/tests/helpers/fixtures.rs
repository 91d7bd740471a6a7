//! Provider fixtures for integration tests.

use glowbook_core::ServiceProvider;

const PROVIDERS_JSON: &str = include_str!("../fixtures/providers.json");

/// The twelve sample providers in `tests/fixtures/providers.json`.
pub fn providers() -> Vec<ServiceProvider> {
    serde_json::from_str(PROVIDERS_JSON).expect("providers fixture should parse")
}
