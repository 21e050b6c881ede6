//! Core types for FrigoFlow
//!
//! Row shapes mirror the hosted backend's tables (`families`, `members`,
//! `shopping_lists`, `list_items`, `invites`), so field names follow the
//! column names when serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque, server-assigned string identifiers.
///
/// The local backend mints ULIDs, but any string the hosted backend hands
/// out is accepted as-is.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Mint a fresh time-ordered identifier
            pub fn generate() -> Self {
                Self(Ulid::new().to_string())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a shopping list
    ListId
);
opaque_id!(
    /// Identifier of a single list item
    ItemId
);
opaque_id!(
    /// Identifier of a family
    FamilyId
);
opaque_id!(
    /// Identifier of an authenticated user (also the member id)
    UserId
);

/// Unit used when an item is added without one
pub const DEFAULT_UNIT: &str = "pcs";

/// A single purchasable line entry within a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ItemId,
    pub list_id: ListId,
    pub label: String,
    pub qty: f64,
    pub unit: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub added_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl ListItem {
    /// Line cost (price × quantity), zero when no price is known
    pub fn line_total(&self) -> f64 {
        self.price.unwrap_or(0.0) * self.qty
    }
}

/// Fields supplied by the user when adding an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub label: String,
    pub qty: f64,
    pub unit: Option<String>,
    pub price: Option<f64>,
}

impl NewItem {
    /// One piece of `label`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            qty: 1.0,
            unit: None,
            price: None,
        }
    }

    pub fn with_qty(mut self, qty: f64) -> Self {
        self.qty = qty;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// Partial update of an existing item. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub label: Option<String>,
    pub qty: Option<f64>,
    pub unit: Option<String>,
    pub checked: Option<bool>,
    /// `Some(None)` clears the price
    pub price: Option<Option<f64>>,
}

impl ItemPatch {
    pub fn checked(checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Default::default()
        }
    }

    /// Apply the patch onto an item in place
    pub fn apply(&self, item: &mut ListItem) {
        if let Some(label) = &self.label {
            item.label = label.clone();
        }
        if let Some(qty) = self.qty {
            item.qty = qty;
        }
        if let Some(unit) = &self.unit {
            item.unit = unit.clone();
        }
        if let Some(checked) = self.checked {
            item.checked = checked;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
    }
}

/// A named collection of items owned by one family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ListId,
    pub name: String,
    pub family_id: FamilyId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// A list together with its item counters, as shown on the home screen
#[derive(Debug, Clone, PartialEq)]
pub struct ListSummary {
    pub list: ShoppingList,
    pub items: usize,
    pub checked_items: usize,
}

/// A group of members sharing lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Membership of one user in one family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub family_id: FamilyId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}
