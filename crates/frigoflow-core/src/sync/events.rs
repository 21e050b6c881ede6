//! Typed change notifications
//!
//! Raw payloads from the change stream are decoded into [`ChangeEvent`]s.
//! Anything that does not decode is reported as a [`PayloadError`] and the
//! synchronizer drops it.

use thiserror::Error;

use crate::backend::RawChange;
use crate::types::{ItemId, ListItem};

/// A decoded row change for a list item
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A new row; carries the full record
    Insert(ListItem),
    /// An existing row changed; carries the full new record
    Update(ListItem),
    /// A row was removed; only its identity is known
    Delete(ItemId),
}

/// Why a raw payload was not applicable
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("unknown event type '{0}'")]
    UnknownEvent(String),

    #[error("row payload is not a valid list item: {0}")]
    InvalidRow(#[from] serde_json::Error),

    #[error("delete payload carries no id")]
    MissingId,
}

impl ChangeEvent {
    /// Decode a raw payload
    pub fn from_raw(raw: &RawChange) -> Result<Self, PayloadError> {
        match raw.event_type.as_str() {
            "INSERT" => Ok(Self::Insert(serde_json::from_value(raw.new.clone())?)),
            "UPDATE" => Ok(Self::Update(serde_json::from_value(raw.new.clone())?)),
            "DELETE" => raw
                .old
                .get("id")
                .and_then(|id| id.as_str())
                .map(|id| Self::Delete(ItemId::from(id)))
                .ok_or(PayloadError::MissingId),
            other => Err(PayloadError::UnknownEvent(other.to_string())),
        }
    }

    /// Identity of the affected item
    pub fn item_id(&self) -> &ItemId {
        match self {
            Self::Insert(item) | Self::Update(item) => &item.id,
            Self::Delete(id) => id,
        }
    }

    /// The carried record, for inserts and updates
    pub fn item(&self) -> Option<&ListItem> {
        match self {
            Self::Insert(item) | Self::Update(item) => Some(item),
            Self::Delete(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}
