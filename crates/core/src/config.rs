//! Search tunables, loaded from `.glowbook.toml` or defaults.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = ".glowbook.toml";

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Queries shorter than this (after trimming) do not trigger a search on their own.
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Known keys in `.glowbook.toml` for config validation.
const KNOWN_CONFIG_KEYS: &[&str] = &[
    "debounce_ms",
    "min_query_len",
    "page_size",
    "featured_page_size",
    "recent_limit",
    "request_timeout_secs",
    "api_url",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub min_query_len: usize,
    pub page_size: u32,
    pub featured_page_size: u32,
    pub recent_limit: usize,
    pub request_timeout_secs: u64,
    /// Base URL of the provider API, when configured in the file.
    pub api_url: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            page_size: DEFAULT_PAGE_SIZE,
            featured_page_size: DEFAULT_PAGE_SIZE,
            recent_limit: DEFAULT_RECENT_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            api_url: None,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Simple Levenshtein edit distance for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn warn_unknown_keys(table: &toml::Table) {
    for key in table.keys() {
        if KNOWN_CONFIG_KEYS.contains(&key.as_str()) {
            continue;
        }
        let suggestion = KNOWN_CONFIG_KEYS
            .iter()
            .min_by_key(|k| edit_distance(key, k))
            .copied()
            .unwrap_or_default();
        if edit_distance(key, suggestion) <= 3 {
            warn!(
                key = key.as_str(),
                suggestion,
                "Unknown key in {CONFIG_FILE_NAME}; did you mean '{suggestion}'?"
            );
        } else {
            warn!(
                key = key.as_str(),
                "Unknown key in {CONFIG_FILE_NAME} (known keys: {})",
                KNOWN_CONFIG_KEYS.join(", ")
            );
        }
    }
}

fn positive_int(table: &toml::Table, key: &str) -> Result<Option<u64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => match value.as_integer() {
            Some(n) if n > 0 => Ok(Some(n as u64)),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: format!("expected a positive integer, got {value}"),
            }),
        },
    }
}

/// Parse config text. Unknown keys warn; bad values are errors.
pub fn parse_search_config(content: &str) -> Result<SearchConfig, ConfigError> {
    let table: toml::Table = content.parse()?;
    warn_unknown_keys(&table);

    let mut config = SearchConfig::default();
    if let Some(ms) = positive_int(&table, "debounce_ms")? {
        config.debounce_ms = ms;
    }
    if let Some(n) = positive_int(&table, "min_query_len")? {
        config.min_query_len = n as usize;
    }
    if let Some(n) = positive_int(&table, "page_size")? {
        config.page_size = n.min(u32::MAX as u64) as u32;
        config.featured_page_size = config.page_size;
    }
    if let Some(n) = positive_int(&table, "featured_page_size")? {
        config.featured_page_size = n.min(u32::MAX as u64) as u32;
    }
    if let Some(n) = positive_int(&table, "recent_limit")? {
        config.recent_limit = n as usize;
    }
    if let Some(n) = positive_int(&table, "request_timeout_secs")? {
        config.request_timeout_secs = n;
    }
    match table.get("api_url") {
        None => {}
        Some(value) => match value.as_str() {
            Some(url) if !url.trim().is_empty() => {
                config.api_url = Some(url.trim().trim_end_matches('/').to_string());
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "api_url".to_string(),
                    reason: "expected a non-empty string".to_string(),
                })
            }
        },
    }

    Ok(config)
}

/// Load `.glowbook.toml` from `dir`. A missing file yields defaults; a file
/// that cannot be read or parsed yields defaults with a warning.
pub fn load_search_config(dir: &Path) -> SearchConfig {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return SearchConfig::default();
    }

    debug!(path = %path.display(), "Loading {CONFIG_FILE_NAME}");
    let parsed = std::fs::read_to_string(&path)
        .map_err(ConfigError::from)
        .and_then(|content| parse_search_config(&content));
    match parsed {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring {CONFIG_FILE_NAME}, using defaults");
            SearchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse_search_config("").unwrap(), SearchConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse_search_config(
            "debounce_ms = 150\npage_size = 50\nrecent_limit = 5\napi_url = \"https://api.example.com/\"\n",
        )
        .unwrap();
        assert_eq!(config.debounce_ms, 150);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.featured_page_size, 50);
        assert_eq!(config.recent_limit, 5);
        assert_eq!(config.api_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let err = parse_search_config("page_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "page_size"));
    }

    #[test]
    fn unknown_keys_do_not_fail() {
        let config = parse_search_config("debounse_ms = 10").unwrap();
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("debounse_ms", "debounce_ms"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "page_size = [").unwrap();
        assert_eq!(load_search_config(tmp.path()), SearchConfig::default());
    }

    #[test]
    fn file_is_loaded_from_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "min_query_len = 2").unwrap();
        assert_eq!(load_search_config(tmp.path()).min_query_len, 2);
    }
}
