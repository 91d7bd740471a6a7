//! Filter presentation: the "is anything filtered?" test and the ordered
//! summary chips shown above search results.

use crate::types::{SearchFilters, ALL_SENTINEL};

/// A text field counts as set when it is non-empty and not the `"All"` sentinel.
pub(crate) fn text_is_active(value: Option<&str>) -> bool {
    match value {
        Some(v) => {
            let v = v.trim();
            !v.is_empty() && v != ALL_SENTINEL
        }
        None => false,
    }
}

/// True iff any field of `filters` constrains the search.
pub fn has_active_filters(filters: &SearchFilters) -> bool {
    text_is_active(filters.category.as_deref())
        || text_is_active(filters.location.as_deref())
        || filters.price_min.is_some()
        || filters.price_max.is_some()
        || filters.rating.is_some()
        || text_is_active(filters.distance.as_deref())
        || filters.available_today == Some(true)
        || filters.available_this_week == Some(true)
        || filters.sort_by.is_some()
        || filters.sort_order.is_some()
}

/// Human-readable fragments for the active filters, in display order:
/// category, price, rating, distance, availability today, availability this
/// week, sort.
pub fn filter_display_text(filters: &SearchFilters) -> Vec<String> {
    let mut chips = Vec::new();

    if let Some(category) = filters.category.as_deref() {
        if text_is_active(Some(category)) {
            chips.push(category.to_string());
        }
    }

    match (filters.price_min, filters.price_max) {
        (Some(min), Some(max)) => chips.push(format!("${}-${}", fmt_num(min), fmt_num(max))),
        (Some(min), None) => chips.push(format!("${}+", fmt_num(min))),
        (None, Some(max)) => chips.push(format!("Up to ${}", fmt_num(max))),
        (None, None) => {}
    }

    if let Some(rating) = filters.rating {
        chips.push(format!("{}+ stars", fmt_num(rating)));
    }

    if let Some(distance) = filters.distance.as_deref() {
        if text_is_active(Some(distance)) {
            chips.push(format!("Within {}", distance.trim()));
        }
    }

    if filters.available_today == Some(true) {
        chips.push("Available today".to_string());
    }
    if filters.available_this_week == Some(true) {
        chips.push("Available this week".to_string());
    }

    if let Some(sort) = filters.sort_by {
        chips.push(sort.label().to_string());
    }

    chips
}

/// Whole numbers print without a fractional part: `20`, `4.5`.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
