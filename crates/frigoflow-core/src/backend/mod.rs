//! Hosted backend contract
//!
//! The application talks to two remote collaborators:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ItemStore    fetch_items(list_id) -> rows ordered by created_at │
//! │  ChangeFeed   subscribe(list_id)   -> FeedSubscription           │
//! │               └── recv() -> RawChange { INSERT | UPDATE | DELETE }│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations (insert/update/delete) are issued against the store directly
//! by the caller; the feed only reports them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::FrigoResult;
use crate::types::{ItemId, ListId, ListItem};

mod hub;
pub mod local;

pub use hub::ChangeHub;
pub use local::LocalBackend;

/// Row-change payload as delivered by the change stream.
///
/// `new` carries the full row for inserts and updates, `old` carries at
/// least the `id` of a deleted row. Absent sides are empty objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub new: Value,
    #[serde(default)]
    pub old: Value,
}

impl RawChange {
    pub fn insert(item: &ListItem) -> FrigoResult<Self> {
        Ok(Self {
            event_type: "INSERT".to_string(),
            new: serde_json::to_value(item)?,
            old: Value::Object(Default::default()),
        })
    }

    /// `previous` is the row before the update, when known
    pub fn update(item: &ListItem, previous: Option<&ListItem>) -> FrigoResult<Self> {
        let old = match previous {
            Some(prev) => serde_json::json!({ "id": prev.id }),
            None => Value::Object(Default::default()),
        };
        Ok(Self {
            event_type: "UPDATE".to_string(),
            new: serde_json::to_value(item)?,
            old,
        })
    }

    pub fn delete(item_id: &ItemId) -> Self {
        Self {
            event_type: "DELETE".to_string(),
            new: Value::Object(Default::default()),
            old: serde_json::json!({ "id": item_id }),
        }
    }
}

/// Identifier of one change feed subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A live subscription to one list's change stream.
///
/// The subscription is released exactly once: by [`unsubscribe`] or, on
/// any other exit path, when the value is dropped.
///
/// [`unsubscribe`]: FeedSubscription::unsubscribe
pub struct FeedSubscription {
    id: SubscriptionId,
    list_id: ListId,
    rx: mpsc::UnboundedReceiver<RawChange>,
    release: Option<ReleaseFn>,
}

impl FeedSubscription {
    /// Wrap a receiver; `release` tells the provider to stop delivering.
    pub fn new(
        id: SubscriptionId,
        list_id: ListId,
        rx: mpsc::UnboundedReceiver<RawChange>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            list_id,
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn list_id(&self) -> &ListId {
        &self.list_id
    }

    /// Next payload in delivery order; `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<RawChange> {
        self.rx.recv().await
    }

    /// Release the subscription now.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            self.rx.close();
            release();
            tracing::debug!(subscription = %self.id, list_id = %self.list_id, "Change feed released");
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("id", &self.id)
            .field("list_id", &self.list_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Remote row store for list items
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items of a list, ordered by creation time ascending
    async fn fetch_items(&self, list_id: &ListId) -> FrigoResult<Vec<ListItem>>;
}

/// Server-driven change notification stream
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start receiving change payloads for one list
    async fn subscribe(&self, list_id: &ListId) -> FrigoResult<FeedSubscription>;
}

/// Everything the list synchronizer needs from a backend
pub trait Backend: ItemStore + ChangeFeed {}

impl<T: ItemStore + ChangeFeed + ?Sized> Backend for T {}
