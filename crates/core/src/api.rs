//! The provider search API seam and the mapping from filter state to request
//! parameters.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ApiError;
use crate::filters::{fmt_num, text_is_active};
use crate::types::{PaginatedResponse, SearchFilters, SearchParams, ServiceProvider};

#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(
        &self,
        params: &SearchParams,
    ) -> Result<PaginatedResponse<ServiceProvider>, ApiError>;

    /// The default listing shown before the user searches for anything.
    async fn featured(
        &self,
        page_size: u32,
    ) -> Result<PaginatedResponse<ServiceProvider>, ApiError> {
        self.search(&SearchParams::page(1, page_size)).await
    }
}

// ---------------------------------------------------------------------------
// Parameter construction
// ---------------------------------------------------------------------------

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").expect("valid distance regex"))
}

/// Numeric miles from a distance label: `"5 mi"` → `5.0`, `"2.5 miles"` → `2.5`.
pub fn parse_distance_miles(label: &str) -> Option<f64> {
    leading_number().captures(label).and_then(|caps| caps[1].parse().ok())
}

/// Map the current query and filters onto outward request parameters.
pub fn build_search_params(
    query: &str,
    filters: &SearchFilters,
    page: u32,
    page_size: u32,
) -> SearchParams {
    let query = query.trim();
    let distance = filters.distance.as_deref().filter(|d| text_is_active(Some(*d))).and_then(
        |label| match parse_distance_miles(label) {
            Some(miles) => Some(format!("{} mi", fmt_num(miles))),
            None => {
                debug!(label, "Distance label has no numeric part, not sending it");
                None
            }
        },
    );

    SearchParams {
        page: page.max(1),
        page_size: page_size.max(1),
        query: (!query.is_empty()).then(|| query.to_string()),
        category: filters.category.clone().filter(|c| text_is_active(Some(c.as_str()))),
        min_rating: filters.rating,
        price_min: filters.price_min,
        price_max: filters.price_max,
        distance,
    }
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

#[cfg(feature = "http")]
pub use http::HttpSearchApi;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use std::time::Duration;

    const SEARCH_PATH: &str = "/providers/search";

    /// Thin client for `GET {base_url}/providers/search`.
    pub struct HttpSearchApi {
        client: reqwest::Client,
        base_url: String,
        token: Option<String>,
    }

    impl HttpSearchApi {
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("glowbook/", env!("CARGO_PKG_VERSION")))
                .build()?;
            Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), token: None })
        }

        /// Attach a bearer token to every request.
        pub fn with_token(mut self, token: impl Into<String>) -> Self {
            self.token = Some(token.into());
            self
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    #[async_trait]
    impl SearchApi for HttpSearchApi {
        async fn search(
            &self,
            params: &SearchParams,
        ) -> Result<PaginatedResponse<ServiceProvider>, ApiError> {
            let url = format!("{}{}", self.base_url, SEARCH_PATH);
            let mut request = self.client.get(&url).query(params);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Status { status: status.as_u16(), body });
            }

            let body = response.bytes().await?;
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_label_is_normalized() {
        let filters = SearchFilters { distance: Some("5 mi".into()), ..Default::default() };
        let params = build_search_params("", &filters, 1, 20);
        assert_eq!(params.distance.as_deref(), Some("5 mi"));

        let filters = SearchFilters { distance: Some("2.5 miles".into()), ..Default::default() };
        let params = build_search_params("", &filters, 1, 20);
        assert_eq!(params.distance.as_deref(), Some("2.5 mi"));
    }

    #[test]
    fn non_numeric_distance_is_dropped() {
        let filters = SearchFilters { distance: Some("nearby".into()), ..Default::default() };
        assert_eq!(build_search_params("", &filters, 1, 20).distance, None);
        assert_eq!(parse_distance_miles("nearby"), None);
    }

    #[test]
    fn category_all_is_not_sent() {
        let filters = SearchFilters { category: Some("All".into()), ..Default::default() };
        assert_eq!(build_search_params("", &filters, 1, 20).category, None);

        let filters = SearchFilters { category: Some("Hair".into()), ..Default::default() };
        assert_eq!(build_search_params("", &filters, 1, 20).category.as_deref(), Some("Hair"));
    }

    #[test]
    fn rating_is_renamed_and_prices_pass_through() {
        let filters = SearchFilters {
            rating: Some(4.0),
            price_min: Some(20.0),
            price_max: Some(100.0),
            ..Default::default()
        };
        let params = build_search_params("  gel nails ", &filters, 2, 10);
        assert_eq!(params.min_rating, Some(4.0));
        assert_eq!(params.price_min, Some(20.0));
        assert_eq!(params.price_max, Some(100.0));
        assert_eq!(params.query.as_deref(), Some("gel nails"));
        assert_eq!((params.page, params.page_size), (2, 10));
    }

    #[test]
    fn blank_query_is_omitted() {
        let params = build_search_params("   ", &SearchFilters::default(), 1, 20);
        assert_eq!(params.query, None);
        assert_eq!(params, SearchParams::page(1, 20));
    }
}
