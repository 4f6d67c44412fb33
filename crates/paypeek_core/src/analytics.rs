//! crates/paypeek_core/src/analytics.rs
//!
//! Summary figures for the overview and sales tabs.

use crate::domain::{Collection, CollectionStatus};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

const TOP_COLLECTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TopCollection {
    pub id: Uuid,
    pub title: String,
    pub earnings: f64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSummary {
    pub total_earnings: f64,
    pub total_views: u64,
    pub active_collections: usize,
    pub expired_collections: usize,
    /// Highest earners first, at most three.
    pub top_collections: Vec<TopCollection>,
}

impl AnalyticsSummary {
    pub fn from_collections(collections: &[Collection]) -> Self {
        let total_earnings: f64 = collections.iter().filter_map(|c| c.earnings).sum();
        let total_views = collections
            .iter()
            .filter_map(|c| c.views)
            .fold(0u64, u64::saturating_add);
        let active_collections = collections
            .iter()
            .filter(|c| c.status == CollectionStatus::Active)
            .count();
        let expired_collections = collections.len() - active_collections;

        let mut ranked: Vec<&Collection> = collections.iter().collect();
        ranked.sort_by(|a, b| {
            b.earnings
                .unwrap_or(0.0)
                .total_cmp(&a.earnings.unwrap_or(0.0))
        });
        let top_collections = ranked
            .into_iter()
            .take(TOP_COLLECTIONS)
            .map(|c| TopCollection {
                id: c.id,
                title: c.title.clone(),
                earnings: c.earnings.unwrap_or(0.0),
                views: c.views.unwrap_or(0),
            })
            .collect();

        Self {
            total_earnings,
            total_views,
            active_collections,
            expired_collections,
            top_collections,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub id: String,
    pub collection: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub buyer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyEarnings {
    pub month: &'static str,
    pub earnings: f64,
}

impl MonthlyEarnings {
    /// Bar height as a percentage of the best month.
    pub fn share_of(&self, best: f64) -> f64 {
        if best > 0.0 {
            self.earnings / best * 100.0
        } else {
            0.0
        }
    }
}

/// Demo sales feed shown on the sales tab.
pub fn recent_sales() -> Vec<Sale> {
    let sale = |id: &str, collection: &str, amount: f64, day: u32, hour: u32, minute: u32, buyer: &str| Sale {
        id: id.to_string(),
        collection: collection.to_string(),
        amount,
        date: Utc
            .with_ymd_and_hms(2023, 7, day, hour, minute, 0)
            .single()
            .unwrap_or_default(),
        buyer: buyer.to_string(),
    };
    vec![
        sale("sale1", "Summer Photography Collection", 19.99, 15, 10, 30, "john.doe@example.com"),
        sale("sale2", "Digital Art Masterclass", 49.99, 14, 14, 45, "jane.smith@example.com"),
        sale("sale3", "Web Development Course", 79.99, 13, 11, 10, "mike.johnson@example.com"),
        sale("sale4", "Cooking Recipes eBook", 14.99, 12, 16, 20, "sarah.williams@example.com"),
    ]
}

/// Demo earnings series for the overview chart.
pub fn monthly_earnings() -> Vec<MonthlyEarnings> {
    const SERIES: [(&str, f64); 12] = [
        ("Jan", 450.0),
        ("Feb", 650.0),
        ("Mar", 850.0),
        ("Apr", 1050.0),
        ("May", 950.0),
        ("Jun", 1250.0),
        ("Jul", 1450.0),
        ("Aug", 1650.0),
        ("Sep", 0.0),
        ("Oct", 0.0),
        ("Nov", 0.0),
        ("Dec", 0.0),
    ];
    SERIES
        .iter()
        .map(|&(month, earnings)| MonthlyEarnings { month, earnings })
        .collect()
}
