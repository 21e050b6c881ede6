//! Persistent storage using redb.
//!
//! This is the row store behind the local backend:
//! - Shopping lists
//! - List items
//! - Families and members
//! - Invite codes
//!
//! Rows are stored as JSON, keyed by their identifier.

use crate::error::FrigoError;
use crate::types::{FamilyId, ItemId, ListId, ListItem, ShoppingList};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

mod families;

use families::{FAMILIES_TABLE, INVITES_TABLE, MEMBERS_TABLE};

// Table definitions
const LISTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("shopping_lists");
const ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("list_items");

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// Creates the parent directory and every table if missing.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, FrigoError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LISTS_TABLE)?;
            let _ = write_txn.open_table(ITEMS_TABLE)?;
            let _ = write_txn.open_table(FAMILIES_TABLE)?;
            let _ = write_txn.open_table(MEMBERS_TABLE)?;
            let _ = write_txn.open_table(INVITES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    fn db_handle(&self) -> Arc<RwLock<Database>> {
        self.db.clone()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // List Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Save a shopping list, overwriting any list with the same id.
    pub fn save_list(&self, list: &ShoppingList) -> Result<(), FrigoError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(LISTS_TABLE)?;
            let data = serde_json::to_vec(list)?;
            table.insert(list.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a single list by id.
    pub fn load_list(&self, list_id: &ListId) -> Result<Option<ShoppingList>, FrigoError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(LISTS_TABLE)?;

        match table.get(list_id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// All lists of a family, newest first.
    pub fn lists_for_family(&self, family_id: &FamilyId) -> Result<Vec<ShoppingList>, FrigoError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(LISTS_TABLE)?;

        let mut lists = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let list: ShoppingList = serde_json::from_slice(value.value())?;
            if &list.family_id == family_id {
                lists.push(list);
            }
        }
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(lists)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Item Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a new item. The owning list must exist.
    pub fn insert_item(&self, item: &ListItem) -> Result<(), FrigoError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let lists = write_txn.open_table(LISTS_TABLE)?;
            if lists.get(item.list_id.as_str())?.is_none() {
                return Err(FrigoError::ListNotFound(item.list_id.to_string()));
            }

            let mut table = write_txn.open_table(ITEMS_TABLE)?;
            let data = serde_json::to_vec(item)?;
            table.insert(item.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Overwrite an existing item with its new state.
    pub fn save_item(&self, item: &ListItem) -> Result<(), FrigoError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(ITEMS_TABLE)?;
            if table.get(item.id.as_str())?.is_none() {
                return Err(FrigoError::ItemNotFound(item.id.to_string()));
            }
            let data = serde_json::to_vec(item)?;
            table.insert(item.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a single item by id.
    pub fn load_item(&self, item_id: &ItemId) -> Result<Option<ListItem>, FrigoError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ITEMS_TABLE)?;

        match table.get(item_id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Remove an item, returning the deleted row if there was one.
    pub fn delete_item(&self, item_id: &ItemId) -> Result<Option<ListItem>, FrigoError> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ITEMS_TABLE)?;
            let removed = table.remove(item_id.as_str())?;
            match removed {
                Some(v) => Some(serde_json::from_slice::<ListItem>(v.value())?),
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// All items of a list ordered by creation time ascending.
    ///
    /// Items created in the same instant are ordered by id.
    pub fn items_for_list(&self, list_id: &ListId) -> Result<Vec<ListItem>, FrigoError> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ITEMS_TABLE)?;

        let mut items = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let item: ListItem = serde_json::from_slice(value.value())?;
            if &item.list_id == list_id {
                items.push(item);
            }
        }
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}
