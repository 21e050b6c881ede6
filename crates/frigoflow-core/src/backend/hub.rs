//! In-process fan-out of row changes to list subscribers

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{FeedSubscription, RawChange, SubscriptionId};
use crate::types::ListId;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    lists: HashMap<ListId, HashMap<SubscriptionId, mpsc::UnboundedSender<RawChange>>>,
}

/// Registry of change feed subscribers, keyed by list
#[derive(Clone, Default)]
pub struct ChangeHub {
    inner: Arc<Mutex<HubInner>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `list_id`.
    ///
    /// Dropping or unsubscribing the returned handle removes it again.
    pub fn subscribe(&self, list_id: &ListId) -> FeedSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = SubscriptionId(inner.next_id);
            inner.lists.entry(list_id.clone()).or_default().insert(id, tx);
            id
        };
        debug!(subscription = %id, %list_id, "Change feed subscribed");

        let weak: Weak<Mutex<HubInner>> = Arc::downgrade(&self.inner);
        let key = list_id.clone();
        FeedSubscription::new(id, list_id.clone(), rx, move || {
            if let Some(inner) = weak.upgrade() {
                remove(&mut inner.lock(), &key, id);
            }
        })
    }

    /// Deliver a change to every current subscriber of `list_id`.
    ///
    /// Returns the number of subscribers reached.
    pub fn publish(&self, list_id: &ListId, change: RawChange) -> usize {
        let mut inner = self.inner.lock();
        let Some(subscribers) = inner.lists.get_mut(list_id) else {
            return 0;
        };

        subscribers.retain(|_, tx| tx.send(change.clone()).is_ok());
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            inner.lists.remove(list_id);
        }
        trace!(%list_id, event = %change.event_type, delivered, "Published change");
        delivered
    }

    /// Number of live subscriptions for a list
    pub fn subscriber_count(&self, list_id: &ListId) -> usize {
        self.inner
            .lock()
            .lists
            .get(list_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

fn remove(inner: &mut HubInner, list_id: &ListId, id: SubscriptionId) {
    if let Some(subscribers) = inner.lists.get_mut(list_id) {
        subscribers.remove(&id);
        if subscribers.is_empty() {
            inner.lists.remove(list_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    #[test]
    fn test_subscribe_and_release() {
        let hub = ChangeHub::new();
        let list = ListId::from("abc");

        let a = hub.subscribe(&list);
        let b = hub.subscribe(&list);
        assert_ne!(a.id(), b.id());
        assert_eq!(hub.subscriber_count(&list), 2);

        a.unsubscribe();
        assert_eq!(hub.subscriber_count(&list), 1);
        drop(b);
        assert_eq!(hub.subscriber_count(&list), 0);
    }

    #[tokio::test]
    async fn test_publish_is_scoped_to_list() {
        let hub = ChangeHub::new();
        let mut abc = hub.subscribe(&ListId::from("abc"));
        let _xyz = hub.subscribe(&ListId::from("xyz"));

        let reached = hub.publish(&ListId::from("abc"), RawChange::delete(&ItemId::from("1")));
        assert_eq!(reached, 1);
        assert_eq!(abc.recv().await.unwrap().old["id"], "1");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = ChangeHub::new();
        assert_eq!(
            hub.publish(&ListId::from("abc"), RawChange::delete(&ItemId::from("1"))),
            0
        );
    }

    #[test]
    fn test_release_after_hub_dropped() {
        let hub = ChangeHub::new();
        let sub = hub.subscribe(&ListId::from("abc"));
        drop(hub);
        sub.unsubscribe();
    }
}
