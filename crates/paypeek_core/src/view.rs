//! crates/paypeek_core/src/view.rs
//!
//! The dashboard's derived view: search, then a stable sort.

use crate::domain::{Collection, DashboardTab, SortDirection, SortOption, ViewMode};
use std::cmp::Ordering;

/// Filters `collections` by `search_query` and orders the result.
///
/// The query matches case-insensitively as a substring of the title or the
/// description; an empty query keeps everything. The sort is stable, so
/// equal keys keep their relative order in both directions.
pub fn compose<'a>(
    collections: &'a [Collection],
    search_query: &str,
    sort_option: SortOption,
    sort_direction: SortDirection,
) -> Vec<&'a Collection> {
    let needle = search_query.to_lowercase();
    let mut visible: Vec<&Collection> = collections
        .iter()
        .filter(|c| needle.is_empty() || matches_query(c, &needle))
        .collect();

    visible.sort_by(|a, b| {
        let ordering = compare(a, b, sort_option);
        match sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    visible
}

fn matches_query(collection: &Collection, needle: &str) -> bool {
    collection.title.to_lowercase().contains(needle)
        || collection
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

fn compare(a: &Collection, b: &Collection, sort_option: SortOption) -> Ordering {
    match sort_option {
        SortOption::Name => collate(&a.title, &b.title),
        SortOption::Date => a.updated_at.cmp(&b.updated_at),
        SortOption::Price => a.price.total_cmp(&b.price),
    }
}

/// Case-insensitive ordering; on a tie, lowercase sorts before uppercase.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// The dashboard's UI state for one browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub search_query: String,
    pub sort_option: SortOption,
    pub sort_direction: SortDirection,
    pub view_mode: ViewMode,
    pub active_tab: DashboardTab,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            sort_option: SortOption::Date,
            sort_direction: SortDirection::Desc,
            view_mode: ViewMode::Grid,
            active_tab: DashboardTab::Overview,
        }
    }
}

impl DashboardView {
    pub fn visible<'a>(&self, collections: &'a [Collection]) -> Vec<&'a Collection> {
        compose(
            collections,
            &self.search_query,
            self.sort_option,
            self.sort_direction,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::seed_collections;
    use crate::domain::CollectionStatus;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn titles(items: &[&Collection]) -> Vec<String> {
        items.iter().map(|c| c.title.clone()).collect()
    }

    fn named(title: &str, price: f64) -> Collection {
        let now = Utc::now();
        Collection {
            id: Uuid::new_v4(),
            title: title.into(),
            price,
            expiry_date: now + Duration::days(1),
            thumbnail_url: None,
            description: None,
            item_count: None,
            status: CollectionStatus::Active,
            views: None,
            earnings: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn video_search_over_seed_data() {
        let seeded = seed_collections();
        let found = compose(&seeded, "VIDEO", SortOption::Name, SortDirection::Asc);
        assert_eq!(
            titles(&found),
            vec!["Digital Art Masterclass", "Fitness Workout Videos"]
        );
    }

    #[test]
    fn every_result_matches_the_query() {
        let seeded = seed_collections();
        for query in ["photo", "course", "e", "zzz", ""] {
            let q = query.to_lowercase();
            for item in compose(&seeded, query, SortOption::Date, SortDirection::Desc) {
                assert!(
                    item.title.to_lowercase().contains(&q)
                        || item
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(&q))
                );
            }
        }
        assert_eq!(compose(&seeded, "", SortOption::Date, SortDirection::Desc).len(), 6);
        assert!(compose(&seeded, "zzz", SortOption::Date, SortDirection::Desc).is_empty());
    }

    #[test]
    fn sorts_by_each_key() {
        let seeded = seed_collections();

        let by_price = compose(&seeded, "", SortOption::Price, SortDirection::Asc);
        let prices: Vec<f64> = by_price.iter().map(|c| c.price).collect();
        assert_eq!(prices, vec![14.99, 19.99, 29.99, 39.99, 49.99, 79.99]);

        let newest_first = compose(&seeded, "", SortOption::Date, SortDirection::Desc);
        assert_eq!(newest_first[0].title, "Cooking Recipes eBook");
        assert_eq!(newest_first[5].title, "Fitness Workout Videos");
    }

    #[test]
    fn sorting_is_idempotent() {
        let seeded = seed_collections();
        let once: Vec<Collection> = compose(&seeded, "", SortOption::Name, SortDirection::Desc)
            .into_iter()
            .cloned()
            .collect();
        let twice = compose(&once, "", SortOption::Name, SortDirection::Desc);
        assert_eq!(titles(&twice), once.iter().map(|c| c.title.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn reversing_direction_reverses_order() {
        let seeded = seed_collections();
        for option in SortOption::ALL {
            let asc = titles(&compose(&seeded, "", *option, SortDirection::Asc));
            let mut desc = titles(&compose(&seeded, "", *option, SortDirection::Desc));
            desc.reverse();
            assert_eq!(asc, desc, "sort by {option}");
        }
    }

    #[test]
    fn name_order_ignores_case() {
        let items = vec![named("beta", 1.0), named("Alpha", 1.0), named("alpha", 1.0)];
        let sorted = compose(&items, "", SortOption::Name, SortDirection::Asc);
        assert_eq!(titles(&sorted), vec!["alpha", "Alpha", "beta"]);
    }

    #[test]
    fn price_ties_keep_insertion_order() {
        let items = vec![named("first", 5.0), named("second", 5.0), named("cheap", 1.0)];
        let asc = compose(&items, "", SortOption::Price, SortDirection::Asc);
        assert_eq!(titles(&asc), vec!["cheap", "first", "second"]);
        let desc = compose(&items, "", SortOption::Price, SortDirection::Desc);
        assert_eq!(titles(&desc), vec!["first", "second", "cheap"]);
    }

    #[test]
    fn default_view_is_newest_first_grid_overview() {
        let view = DashboardView::default();
        assert_eq!(view.sort_option, SortOption::Date);
        assert_eq!(view.sort_direction, SortDirection::Desc);
        assert_eq!(view.view_mode, ViewMode::Grid);
        assert_eq!(view.active_tab, DashboardTab::Overview);
        assert_eq!(view.visible(&seed_collections()).len(), 6);
    }
}
