//! crates/paypeek_core/src/collections.rs
//!
//! In-memory store of the collections shown on the dashboard. Nothing is
//! persisted: the store lives exactly as long as its owner.

use crate::domain::{Collection, CollectionDraft, CollectionStatus};
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectionError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Price must be a non-negative amount")]
    InvalidPrice,
    #[error("Earnings must be a non-negative amount")]
    InvalidEarnings,
    #[error("Collection {0} not found")]
    NotFound(Uuid),
}

pub type CollectionResult<T> = Result<T, CollectionError>;

#[derive(Debug, Clone, Default)]
pub struct CollectionStore {
    items: Vec<Collection>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the demo collections.
    pub fn seeded() -> Self {
        Self {
            items: seed_collections(),
        }
    }

    /// All collections in insertion order. Callers sort explicitly.
    pub fn list(&self) -> &[Collection] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&Collection> {
        self.items.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn create(&mut self, draft: CollectionDraft) -> CollectionResult<Collection> {
        validate(&draft)?;
        let now = Utc::now();
        let collection = Collection {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            price: draft.price,
            expiry_date: draft.expiry_date,
            thumbnail_url: non_empty(draft.thumbnail_url),
            description: non_empty(draft.description),
            item_count: draft.item_count,
            status: draft.status,
            views: draft.views,
            earnings: draft.earnings,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %collection.id, "Collection created");
        self.items.push(collection.clone());
        Ok(collection)
    }

    /// Replaces the editable fields of an existing collection. Sales statistics
    /// (views, earnings) and `created_at` are kept.
    pub fn update(&mut self, id: Uuid, draft: CollectionDraft) -> CollectionResult<Collection> {
        validate(&draft)?;
        let existing = self
            .items
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CollectionError::NotFound(id))?;

        existing.title = draft.title.trim().to_string();
        existing.price = draft.price;
        existing.expiry_date = draft.expiry_date;
        existing.thumbnail_url = non_empty(draft.thumbnail_url);
        existing.description = non_empty(draft.description);
        existing.item_count = draft.item_count;
        existing.status = draft.status;
        // Never earlier than creation, even if the clock stepped back.
        existing.updated_at = Utc::now().max(existing.created_at);

        debug!(%id, "Collection updated");
        Ok(existing.clone())
    }

    /// Removes the collection. Returns `false` (and changes nothing) when the id is unknown.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        let removed = self.items.len() != before;
        debug!(%id, removed, "Collection delete");
        removed
    }
}

fn validate(draft: &CollectionDraft) -> CollectionResult<()> {
    if draft.title.trim().is_empty() {
        return Err(CollectionError::EmptyTitle);
    }
    if !draft.price.is_finite() || draft.price < 0.0 {
        return Err(CollectionError::InvalidPrice);
    }
    if let Some(earnings) = draft.earnings {
        if !earnings.is_finite() || earnings < 0.0 {
            return Err(CollectionError::InvalidEarnings);
        }
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The public link buyers use to open a collection.
pub fn share_link(base_url: &str, id: Uuid) -> String {
    format!("{}/c/{}", base_url.trim_end_matches('/'), id)
}

//=========================================================================================
// Seed Data
//=========================================================================================

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn unsplash(photo: &str) -> Option<String> {
    Some(format!(
        "https://images.unsplash.com/photo-{photo}?ixlib=rb-4.0.3&auto=format&fit=crop&w=1950&q=80"
    ))
}

struct Seed {
    n: u128,
    title: &'static str,
    price: f64,
    expiry: (i32, u32, u32),
    photo: &'static str,
    status: CollectionStatus,
    created: (i32, u32, u32, u32, u32),
    description: &'static str,
    item_count: u32,
    views: u64,
    earnings: f64,
}

const SEEDS: [Seed; 6] = [
    Seed {
        n: 1,
        title: "Summer Photography Collection",
        price: 19.99,
        expiry: (2025, 12, 31),
        photo: "1501854140801-50d01698950b",
        status: CollectionStatus::Active,
        created: (2023, 6, 15, 10, 30),
        description: "A collection of stunning summer landscapes and beach photography from around the world.",
        item_count: 25,
        views: 342,
        earnings: 1245.67,
    },
    Seed {
        n: 2,
        title: "Digital Art Masterclass",
        price: 49.99,
        expiry: (2025, 10, 15),
        photo: "1547891654-e66ed7ebb968",
        status: CollectionStatus::Active,
        created: (2023, 5, 20, 14, 45),
        description: "Learn digital art techniques from professional artists with over 50 hours of video content.",
        item_count: 42,
        views: 189,
        earnings: 899.82,
    },
    Seed {
        n: 3,
        title: "Fitness Workout Videos",
        price: 29.99,
        expiry: (2023, 8, 1),
        photo: "1517836357463-d25dfeac3438",
        status: CollectionStatus::Expired,
        created: (2023, 2, 10, 9, 15),
        description: "Complete home workout routines for all fitness levels with professional trainers.",
        item_count: 30,
        views: 521,
        earnings: 1567.29,
    },
    Seed {
        n: 4,
        title: "Cooking Recipes eBook",
        price: 14.99,
        expiry: (2025, 11, 20),
        photo: "1556911220-bff31c812dba",
        status: CollectionStatus::Active,
        created: (2023, 7, 5, 16, 20),
        description: "Over 100 delicious recipes from around the world with step-by-step instructions.",
        item_count: 112,
        views: 276,
        earnings: 419.72,
    },
    Seed {
        n: 5,
        title: "Web Development Course",
        price: 79.99,
        expiry: (2025, 9, 30),
        photo: "1498050108023-c5249f4df085",
        status: CollectionStatus::Active,
        created: (2023, 4, 12, 11, 10),
        description: "Comprehensive web development course covering HTML, CSS, JavaScript, React, and Node.js.",
        item_count: 85,
        views: 412,
        earnings: 3299.59,
    },
    Seed {
        n: 6,
        title: "Stock Photo Bundle",
        price: 39.99,
        expiry: (2025, 8, 15),
        photo: "1542038784456-1ea8e935640e",
        status: CollectionStatus::Active,
        created: (2023, 3, 25, 13, 40),
        description: "High-quality stock photos for commercial use, including nature, business, and lifestyle images.",
        item_count: 200,
        views: 156,
        earnings: 623.84,
    },
];

/// The id of the `n`th demo collection (1-based).
pub fn seed_id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// The six demo collections every new dashboard starts with.
pub fn seed_collections() -> Vec<Collection> {
    SEEDS
        .iter()
        .map(|seed| {
            let (y, mo, d, h, mi) = seed.created;
            let created = at(y, mo, d, h, mi);
            let (ey, em, ed) = seed.expiry;
            Collection {
                id: seed_id(seed.n),
                title: seed.title.to_string(),
                price: seed.price,
                expiry_date: at(ey, em, ed, 0, 0),
                thumbnail_url: unsplash(seed.photo),
                description: Some(seed.description.to_string()),
                item_count: Some(seed.item_count),
                status: seed.status,
                views: Some(seed.views),
                earnings: Some(seed.earnings),
                created_at: created,
                updated_at: created,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(title: &str, price: f64) -> CollectionDraft {
        CollectionDraft {
            title: title.to_string(),
            price,
            expiry_date: Utc::now() + Duration::days(30),
            thumbnail_url: None,
            description: None,
            item_count: None,
            status: CollectionStatus::Active,
            views: Some(0),
            earnings: Some(0.0),
        }
    }

    #[test]
    fn create_assigns_fresh_id_and_equal_timestamps() {
        let mut store = CollectionStore::seeded();
        let before: Vec<Uuid> = store.list().iter().map(|c| c.id).collect();

        let created = store.create(draft("Test", 9.99)).unwrap();

        assert_eq!(store.len(), before.len() + 1);
        assert!(!before.contains(&created.id));
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(store.list().last(), Some(&created));
    }

    #[test]
    fn create_rejects_blank_title_and_bad_price() {
        let mut store = CollectionStore::new();
        assert_eq!(store.create(draft("   ", 1.0)), Err(CollectionError::EmptyTitle));
        assert_eq!(store.create(draft("Bad", -0.01)), Err(CollectionError::InvalidPrice));
        assert_eq!(store.create(draft("Bad", f64::NAN)), Err(CollectionError::InvalidPrice));
        assert!(store.is_empty());
    }

    #[test]
    fn zero_price_is_allowed() {
        let mut store = CollectionStore::new();
        assert!(store.create(draft("Freebie", 0.0)).is_ok());
    }

    #[test]
    fn update_replaces_fields_and_keeps_stats() {
        let mut store = CollectionStore::seeded();
        let id = seed_id(1);
        let before = store.get(id).cloned().unwrap();

        let mut edit = draft("Summer Photos Remastered", 24.5);
        edit.description = Some("  ".into());
        edit.status = CollectionStatus::Expired;
        let updated = store.update(id, edit).unwrap();

        assert_eq!(updated.title, "Summer Photos Remastered");
        assert_eq!(updated.price, 24.5);
        assert_eq!(updated.description, None);
        assert_eq!(updated.status, CollectionStatus::Expired);
        assert_eq!(updated.views, before.views);
        assert_eq!(updated.earnings, before.earnings);
        assert_eq!(updated.created_at, before.created_at);
        assert!(updated.updated_at >= updated.created_at);
        assert!(updated.updated_at > before.updated_at);
    }

    #[test]
    fn update_validates_like_create() {
        let mut store = CollectionStore::seeded();
        let id = seed_id(2);
        let snapshot = store.list().to_vec();

        assert_eq!(store.update(id, draft("", 1.0)), Err(CollectionError::EmptyTitle));
        assert_eq!(store.update(id, draft("Cheaper", -5.0)), Err(CollectionError::InvalidPrice));
        assert_eq!(store.list(), snapshot.as_slice());
    }

    #[test]
    fn update_of_unknown_id_is_not_found() {
        let mut store = CollectionStore::seeded();
        let missing = Uuid::new_v4();
        let snapshot = store.list().to_vec();

        assert_eq!(
            store.update(missing, draft("Ghost", 1.0)),
            Err(CollectionError::NotFound(missing))
        );
        assert_eq!(store.list(), snapshot.as_slice());
    }

    #[test]
    fn delete_unknown_id_changes_nothing() {
        let mut store = CollectionStore::seeded();
        let snapshot = store.list().to_vec();

        assert!(!store.delete(Uuid::new_v4()));
        assert_eq!(store.list(), snapshot.as_slice());

        assert!(store.delete(seed_id(3)));
        assert_eq!(store.len(), 5);
        assert!(store.get(seed_id(3)).is_none());
    }

    #[test]
    fn seed_matches_demo_dashboard() {
        let seeded = seed_collections();
        assert_eq!(seeded.len(), 6);
        let expired: Vec<_> = seeded
            .iter()
            .filter(|c| c.status == CollectionStatus::Expired)
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(expired, vec!["Fitness Workout Videos"]);
        assert!(seeded.iter().all(|c| c.updated_at >= c.created_at));
    }

    #[test]
    fn share_link_joins_base_and_id() {
        let id = seed_id(5);
        assert_eq!(
            share_link("https://paypeek.com/", id),
            format!("https://paypeek.com/c/{id}")
        );
    }
}
