//! Client-side ordering of a returned result page.
//!
//! Each sort field has a natural direction used when no explicit order is
//! given: name A→Z, rating high→low, price low→high, distance near→far,
//! availability soonest first. An explicit `asc`/`desc` orders by the raw value.
//! Providers missing the sort value always go last. The sort is stable.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::{SearchFilters, ServiceProvider, SortBy, SortOrder};

/// Direction used for `sort_by` when the filters carry no explicit order.
pub fn natural_order(sort_by: SortBy) -> SortOrder {
    match sort_by {
        SortBy::Name | SortBy::Price | SortBy::Distance => SortOrder::Asc,
        SortBy::Rating | SortBy::Availability => SortOrder::Desc,
    }
}

/// Sort `providers` in place according to `filters.sort_by` / `sort_order`.
/// No-op when no sort field is set.
pub fn apply_client_sort(providers: &mut [ServiceProvider], filters: &SearchFilters) {
    if let Some(sort_by) = filters.sort_by {
        sort_providers(providers, sort_by, filters.sort_order);
    }
}

pub fn sort_providers(providers: &mut [ServiceProvider], sort_by: SortBy, order: Option<SortOrder>) {
    let order = order.unwrap_or_else(|| natural_order(sort_by));
    providers.sort_by(|a, b| compare(a, b, sort_by, order));
}

fn compare(a: &ServiceProvider, b: &ServiceProvider, sort_by: SortBy, order: SortOrder) -> Ordering {
    match sort_by {
        SortBy::Name => directed(compare_names(&a.name, &b.name), order),
        SortBy::Rating => compare_optional(a.rating, b.rating, order),
        SortBy::Price => compare_optional(a.price_from, b.price_from, order),
        SortBy::Distance => compare_optional(a.distance, b.distance, order),
        SortBy::Availability => {
            directed(availability_rank(a).cmp(&availability_rank(b)), order)
        }
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Missing values sort after present ones in either direction.
fn compare_optional(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(x.total_cmp(&y), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Base letters only: decomposed, combining marks dropped, lowercased.
/// "Éclat" and "eclat" share a key and sort between "Avery" and "Zen".
fn collation_key(name: &str) -> String {
    name.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase).collect()
}

/// Collation key first; then accents, then case break ties, so "eclat",
/// "Eclat" and "Éclat" stay adjacent in a fixed order.
fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn availability_rank(p: &ServiceProvider) -> u8 {
    if p.available_today == Some(true) {
        2
    } else if p.available_this_week == Some(true) {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str, rating: Option<f64>) -> ServiceProvider {
        ServiceProvider { id: name.to_lowercase(), name: name.into(), rating, ..Default::default() }
    }

    fn names(providers: &[ServiceProvider]) -> Vec<&str> {
        providers.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn no_sort_field_leaves_order() {
        let mut list = vec![provider("b", None), provider("a", None)];
        apply_client_sort(&mut list, &SearchFilters::default());
        assert_eq!(names(&list), vec!["b", "a"]);
    }

    #[test]
    fn rating_defaults_to_highest_first() {
        let mut list =
            vec![provider("Low", Some(3.1)), provider("None", None), provider("High", Some(4.9))];
        sort_providers(&mut list, SortBy::Rating, None);
        assert_eq!(names(&list), vec!["High", "Low", "None"]);
    }

    #[test]
    fn rating_asc_is_lowest_first_missing_still_last() {
        let mut list =
            vec![provider("None", None), provider("High", Some(4.9)), provider("Low", Some(3.1))];
        sort_providers(&mut list, SortBy::Rating, Some(SortOrder::Asc));
        assert_eq!(names(&list), vec!["Low", "High", "None"]);
    }

    #[test]
    fn name_sort_is_case_insensitive_and_reversible() {
        let mut list = vec![provider("bella", None), provider("Ava", None), provider("Cora", None)];
        sort_providers(&mut list, SortBy::Name, None);
        assert_eq!(names(&list), vec!["Ava", "bella", "Cora"]);

        sort_providers(&mut list, SortBy::Name, Some(SortOrder::Desc));
        assert_eq!(names(&list), vec!["Cora", "bella", "Ava"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let mut list = vec![
            provider("Zen Nails", None),
            provider("Éclat Spa", None),
            provider("Avery Hair", None),
            provider("eclat studio", None),
        ];
        sort_providers(&mut list, SortBy::Name, None);
        assert_eq!(names(&list), vec!["Avery Hair", "Éclat Spa", "eclat studio", "Zen Nails"]);

        sort_providers(&mut list, SortBy::Name, Some(SortOrder::Desc));
        assert_eq!(names(&list), vec!["Zen Nails", "eclat studio", "Éclat Spa", "Avery Hair"]);
    }

    #[test]
    fn accent_only_differences_have_a_fixed_order() {
        assert_eq!(compare_names("Cafe", "Café"), Ordering::Less);
        assert_eq!(compare_names("Café", "Cafe"), Ordering::Greater);
        assert_eq!(collation_key("Ångström Ñail"), "angstrom nail");
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let mut list = vec![
            provider("First", Some(4.0)),
            provider("Second", Some(4.0)),
            provider("Third", Some(5.0)),
        ];
        sort_providers(&mut list, SortBy::Rating, None);
        assert_eq!(names(&list), vec!["Third", "First", "Second"]);
    }

    #[test]
    fn distance_and_price_default_ascending() {
        let mut list = vec![
            ServiceProvider { name: "Far".into(), distance: Some(9.0), price_from: Some(10.0), ..Default::default() },
            ServiceProvider { name: "Near".into(), distance: Some(0.5), price_from: Some(80.0), ..Default::default() },
        ];
        sort_providers(&mut list, SortBy::Distance, None);
        assert_eq!(names(&list), vec!["Near", "Far"]);

        sort_providers(&mut list, SortBy::Price, None);
        assert_eq!(names(&list), vec!["Far", "Near"]);
    }

    #[test]
    fn availability_puts_today_first() {
        let mut list = vec![
            ServiceProvider { name: "Later".into(), ..Default::default() },
            ServiceProvider { name: "Week".into(), available_this_week: Some(true), ..Default::default() },
            ServiceProvider { name: "Today".into(), available_today: Some(true), ..Default::default() },
        ];
        sort_providers(&mut list, SortBy::Availability, None);
        assert_eq!(names(&list), vec!["Today", "Week", "Later"]);
    }
}
