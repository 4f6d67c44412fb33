//! crates/paypeek_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any HTTP layer or serialization format.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Identity
//=========================================================================================

/// A signed-in identity, validated at the identity provider boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// The name shown in the dashboard header, falling back to the e-mail.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Profile data attached to an identity when it is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserMetadata {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A live session issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl ProviderSession {
    /// True once `now` is within `margin` of the expiry instant.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }
}

//=========================================================================================
// Collections
//=========================================================================================

/// Caller-assigned availability of a collection. Never derived from the expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionStatus {
    Active,
    Expired,
}

impl CollectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

/// A priced, time-bounded bundle of content items offered for sale.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub expiry_date: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub item_count: Option<u32>,
    pub status: CollectionStatus,
    pub views: Option<u64>,
    pub earnings: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The caller-supplied fields of a collection, as submitted by the create/edit form.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDraft {
    pub title: String,
    pub price: f64,
    pub expiry_date: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub item_count: Option<u32>,
    pub status: CollectionStatus,
    pub views: Option<u64>,
    pub earnings: Option<f64>,
}

//=========================================================================================
// Dashboard view state
//=========================================================================================

/// Returned by the `FromStr` impls below when a name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum!(
    /// The key the collection list is ordered by.
    SortOption, "sort option", {
        Name => "name",
        Date => "date",
        Price => "price",
    }
);

named_enum!(SortDirection, "sort direction", {
    Asc => "asc",
    Desc => "desc",
});

named_enum!(ViewMode, "view mode", {
    Grid => "grid",
    List => "list",
});

named_enum!(DashboardTab, "dashboard tab", {
    Overview => "overview",
    Collections => "collections",
    Sales => "sales",
    Settings => "settings",
});

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for CollectionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(UnknownVariant {
                kind: "collection status",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_enums_parse_case_insensitively() {
        assert_eq!("Price".parse::<SortOption>(), Ok(SortOption::Price));
        assert_eq!(" desc ".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert_eq!("settings".parse::<DashboardTab>(), Ok(DashboardTab::Settings));
        assert_eq!(ViewMode::List.to_string(), "list");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "rating".parse::<SortOption>().unwrap_err();
        assert_eq!(err.to_string(), "unknown sort option 'rating'");
        assert!("archived".parse::<CollectionStatus>().is_err());
    }

    #[test]
    fn user_label_prefers_display_name() {
        let mut user = User {
            id: Uuid::nil(),
            email: "ana@example.com".into(),
            display_name: Some("Ana".into()),
            avatar_url: None,
        };
        assert_eq!(user.label(), "Ana");
        user.display_name = Some("  ".into());
        assert_eq!(user.label(), "ana@example.com");
    }

    #[test]
    fn session_needs_refresh_inside_margin() {
        let now = Utc::now();
        let session = ProviderSession {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now + Duration::seconds(30),
            user: User {
                id: Uuid::nil(),
                email: "x@example.com".into(),
                display_name: None,
                avatar_url: None,
            },
        };
        assert!(session.needs_refresh(now, Duration::seconds(60)));
        assert!(!session.needs_refresh(now, Duration::seconds(10)));
    }
}
