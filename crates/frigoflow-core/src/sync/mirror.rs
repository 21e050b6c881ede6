//! Local mirror of one list's items
//!
//! Pure state: the rules for folding change events into an ordered item
//! sequence, with no runtime or I/O attached.

use crate::config::Ordering;
use crate::types::{ItemId, ListItem};

use super::events::ChangeEvent;

#[derive(Debug, Clone, Default)]
pub struct ItemMirror {
    items: Vec<ListItem>,
    ordering: Ordering,
}

impl ItemMirror {
    pub fn new(ordering: Ordering) -> Self {
        Self {
            items: Vec::new(),
            ordering,
        }
    }

    /// Replace the contents with a bulk fetch result, sorted by
    /// `created_at` ascending (ties by id).
    pub fn load(&mut self, mut rows: Vec<ListItem>) {
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        self.items = rows;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Fold one event in. Returns whether the sequence changed.
    ///
    /// - Insert appends (or, with [`Ordering::CreatedAt`], lands after every
    ///   item created no later than it). An insert for an id already present
    ///   replaces that item in place.
    /// - Update replaces the matching item in place; unknown ids are ignored.
    /// - Delete removes the matching item; unknown ids are ignored.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        match event {
            ChangeEvent::Insert(item) => {
                // The worker subscribes before fetching, so a row inserted
                // in between arrives both in the fetch and as a notification.
                if let Some(pos) = self.position(&item.id) {
                    self.items[pos] = item.clone();
                    return true;
                }
                match self.ordering {
                    Ordering::Arrival => self.items.push(item.clone()),
                    Ordering::CreatedAt => {
                        let at = self
                            .items
                            .partition_point(|existing| existing.created_at <= item.created_at);
                        self.items.insert(at, item.clone());
                    }
                }
                true
            }
            ChangeEvent::Update(item) => match self.position(&item.id) {
                Some(pos) => {
                    self.items[pos] = item.clone();
                    true
                }
                None => false,
            },
            ChangeEvent::Delete(id) => match self.position(id) {
                Some(pos) => {
                    self.items.remove(pos);
                    true
                }
                None => false,
            },
        }
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListId, UserId};
    use chrono::{DateTime, Duration, Utc};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn item(id: &str, label: &str, minute: i64) -> ListItem {
        ListItem {
            id: ItemId::from(id),
            list_id: ListId::from("abc"),
            label: label.to_string(),
            qty: 1.0,
            unit: "pcs".to_string(),
            checked: false,
            price: None,
            added_by: UserId::from("alice"),
            created_at: t0() + Duration::minutes(minute),
        }
    }

    fn labels(mirror: &ItemMirror) -> Vec<&str> {
        mirror.items().iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn test_load_sorts_by_creation() {
        let mut mirror = ItemMirror::default();
        mirror.load(vec![item("2", "Bread", 2), item("1", "Milk", 1)]);
        assert_eq!(labels(&mirror), vec!["Milk", "Bread"]);
    }

    #[test]
    fn test_insert_appends_in_arrival_order() {
        let mut mirror = ItemMirror::new(Ordering::Arrival);
        mirror.load(vec![item("1", "Milk", 5)]);
        // Older than Milk, still goes last
        assert!(mirror.apply(&ChangeEvent::Insert(item("0", "Salt", 0))));
        assert_eq!(labels(&mirror), vec!["Milk", "Salt"]);
    }

    #[test]
    fn test_insert_by_created_at() {
        let mut mirror = ItemMirror::new(Ordering::CreatedAt);
        mirror.load(vec![item("1", "Milk", 1), item("3", "Eggs", 3)]);
        mirror.apply(&ChangeEvent::Insert(item("2", "Bread", 2)));
        mirror.apply(&ChangeEvent::Insert(item("4", "Jam", 3)));
        assert_eq!(labels(&mirror), vec!["Milk", "Bread", "Eggs", "Jam"]);
    }

    #[test]
    fn test_duplicate_insert_replaces_in_place() {
        let mut mirror = ItemMirror::default();
        mirror.load(vec![item("1", "Milk", 1), item("2", "Bread", 2)]);
        mirror.apply(&ChangeEvent::Insert(item("1", "Whole milk", 1)));
        assert_eq!(labels(&mirror), vec!["Whole milk", "Bread"]);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut mirror = ItemMirror::default();
        mirror.load(vec![item("1", "Milk", 1), item("2", "Bread", 2)]);
        let mut checked = item("1", "Milk", 1);
        checked.checked = true;

        assert!(mirror.apply(&ChangeEvent::Update(checked)));
        assert!(mirror.items()[0].checked);
        assert_eq!(labels(&mirror), vec!["Milk", "Bread"]);
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let mut mirror = ItemMirror::default();
        mirror.load(vec![item("1", "Milk", 1)]);
        assert!(!mirror.apply(&ChangeEvent::Update(item("9", "Ghost", 0))));
        assert_eq!(labels(&mirror), vec!["Milk"]);
    }

    #[test]
    fn test_delete_twice() {
        let mut mirror = ItemMirror::default();
        mirror.load(vec![item("1", "Milk", 1), item("2", "Bread", 2)]);
        let delete = ChangeEvent::Delete(ItemId::from("2"));

        assert!(mirror.apply(&delete));
        assert!(!mirror.apply(&delete));
        assert_eq!(labels(&mirror), vec!["Milk"]);
    }
}
