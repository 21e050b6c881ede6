//! Property-based tests for the list mirror
//!
//! Uses proptest to check the folding rules of [`ItemMirror`] against a
//! plain vector model.

use chrono::{TimeZone, Utc};
use frigoflow_core::{ChangeEvent, ItemId, ItemMirror, ListId, ListItem, Ordering, UserId};
use proptest::prelude::*;

// ============================================================================
// Strategy Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, String),
    Update(u8, String),
    Delete(u8),
}

fn label_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z ]{1,20}").expect("valid regex")
}

/// Small id space so updates and deletes hit existing rows often
fn ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (0..8u8, label_strategy()).prop_map(|(id, l)| Op::Insert(id, l)),
            2 => (0..8u8, label_strategy()).prop_map(|(id, l)| Op::Update(id, l)),
            2 => (0..8u8).prop_map(Op::Delete),
        ],
        0..max_ops,
    )
}

fn item(id: u8, label: &str, secs: i64) -> ListItem {
    ListItem {
        id: ItemId::from(id.to_string()),
        list_id: ListId::from("abc"),
        label: label.to_string(),
        qty: 1.0,
        unit: "pcs".to_string(),
        checked: false,
        price: None,
        added_by: UserId::from("alice"),
        created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

fn to_event(op: &Op, step: usize) -> ChangeEvent {
    match op {
        Op::Insert(id, label) => ChangeEvent::Insert(item(*id, label, step as i64)),
        Op::Update(id, label) => ChangeEvent::Update(item(*id, label, step as i64)),
        Op::Delete(id) => ChangeEvent::Delete(ItemId::from(id.to_string())),
    }
}

fn snapshot(mirror: &ItemMirror) -> Vec<(String, String)> {
    mirror
        .items()
        .iter()
        .map(|i| (i.id.to_string(), i.label.clone()))
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Arrival ordering matches the vector model op for op
    #[test]
    fn prop_mirror_matches_model(ops in ops_strategy(60)) {
        let mut mirror = ItemMirror::new(Ordering::Arrival);
        let mut model: Vec<(String, String)> = Vec::new();

        for (step, op) in ops.iter().enumerate() {
            let before = model.clone();
            match op {
                Op::Insert(id, label) => {
                    let id = id.to_string();
                    match model.iter().position(|(i, _)| *i == id) {
                        Some(pos) => model[pos].1 = label.clone(),
                        None => model.push((id, label.clone())),
                    }
                }
                Op::Update(id, label) => {
                    let id = id.to_string();
                    if let Some(pos) = model.iter().position(|(i, _)| *i == id) {
                        model[pos].1 = label.clone();
                    }
                }
                Op::Delete(id) => {
                    let id = id.to_string();
                    model.retain(|(i, _)| *i != id);
                }
            }

            let changed = mirror.apply(&to_event(op, step));
            prop_assert_eq!(snapshot(&mirror), model.clone());
            if !changed {
                prop_assert_eq!(&before, &model);
            }
        }
    }

    /// Ids stay unique whatever the event sequence
    #[test]
    fn prop_ids_unique(ops in ops_strategy(80)) {
        for ordering in [Ordering::Arrival, Ordering::CreatedAt] {
            let mut mirror = ItemMirror::new(ordering);
            for (step, op) in ops.iter().enumerate() {
                mirror.apply(&to_event(op, step));
            }
            let mut ids: Vec<_> = mirror.items().iter().map(|i| i.id.clone()).collect();
            let len = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), len);
        }
    }

    /// Deleting twice is the same as deleting once
    #[test]
    fn prop_delete_idempotent(ops in ops_strategy(40), target in 0..8u8) {
        let mut mirror = ItemMirror::new(Ordering::Arrival);
        for (step, op) in ops.iter().enumerate() {
            mirror.apply(&to_event(op, step));
        }

        let delete = ChangeEvent::Delete(ItemId::from(target.to_string()));
        mirror.apply(&delete);
        let once = snapshot(&mirror);
        prop_assert!(!mirror.apply(&delete));
        prop_assert_eq!(snapshot(&mirror), once);
    }

    /// A bulk load comes out sorted by creation time
    #[test]
    fn prop_load_sorted(offsets in prop::collection::vec(0..10_000i64, 0..50)) {
        let rows: Vec<ListItem> = offsets
            .iter()
            .enumerate()
            .map(|(n, secs)| {
                let mut row = item(0, "x", *secs);
                row.id = ItemId::from(format!("{:03}", n));
                row
            })
            .collect();

        let mut mirror = ItemMirror::new(Ordering::Arrival);
        mirror.load(rows);
        let items = mirror.items();
        prop_assert_eq!(items.len(), offsets.len());
        prop_assert!(items.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    /// With created_at ordering the sequence stays sorted after inserts
    #[test]
    fn prop_created_at_stays_sorted(inserts in prop::collection::vec((0..8u8, 0..1_000i64), 0..40)) {
        let mut mirror = ItemMirror::new(Ordering::CreatedAt);
        for (id, secs) in inserts {
            // Only fresh ids, replacement keeps the old position
            let fresh = ItemId::from(id.to_string());
            if mirror.items().iter().any(|existing| existing.id == fresh) {
                continue;
            }
            mirror.apply(&ChangeEvent::Insert(item(id, "x", secs)));
        }
        let items = mirror.items();
        prop_assert!(items.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
