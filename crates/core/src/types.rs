//! Core value types shared across the engine: search filters, history records,
//! provider results, and the outward request parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel used by pickers to mean "no constraint".
pub const ALL_SENTINEL: &str = "All";

// ---------------------------------------------------------------------------
// Sort options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Price,
    Rating,
    Distance,
    Availability,
    Name,
}

impl SortBy {
    pub const ALL: [SortBy; 5] =
        [SortBy::Price, SortBy::Rating, SortBy::Distance, SortBy::Availability, SortBy::Name];

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Price => "price",
            SortBy::Rating => "rating",
            SortBy::Distance => "distance",
            SortBy::Availability => "availability",
            SortBy::Name => "name",
        }
    }

    /// Chip label shown in the active-filter summary.
    pub fn label(self) -> &'static str {
        match self {
            SortBy::Price => "Sort by price",
            SortBy::Rating => "Sort by rating",
            SortBy::Distance => "Sort by distance",
            SortBy::Availability => "Sort by availability",
            SortBy::Name => "Sort by name",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortBy::ALL
            .into_iter()
            .find(|sort| sort.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown sort field '{s}' (expected price, rating, distance, availability, name)")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("unknown sort order '{s}' (expected asc or desc)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// The active constraints of a search. Every field is optional; absent fields
/// are omitted from the persisted JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    /// Minimum star rating, 1 to 5.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Free-form label such as "5 mi".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_today: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_this_week: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

// ---------------------------------------------------------------------------
// History records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
    pub timestamp: DateTime<Utc>,
}

impl RecentSearch {
    /// Same query text and structurally equal filters.
    pub fn matches(&self, query: &str, filters: &SearchFilters) -> bool {
        self.query == query && self.filters == *filters
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: String,
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub filters: SearchFilters,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Remote API shapes
// ---------------------------------------------------------------------------

/// A bookable provider as returned by the search API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceProvider {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub location: Option<String>,
    /// Distance from the user in miles.
    pub distance: Option<f64>,
    pub price_from: Option<f64>,
    pub available_today: Option<bool>,
    pub available_this_week: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "first_page")]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

/// Query parameters of the paginated provider search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
}

impl SearchParams {
    /// A bare page request with no constraints.
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            query: None,
            category: None,
            min_rating: None,
            price_min: None,
            price_max: None,
            distance: None,
        }
    }
}
