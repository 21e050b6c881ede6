//! Local backend: redb row store plus in-process change feed
//!
//! Implements the hosted backend contract for a single process. Every item
//! write is committed to [`Storage`] first and only then published to the
//! list's subscribers, so a subscriber never hears about a row the store
//! does not have.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::{ChangeFeed, ChangeHub, FeedSubscription, ItemStore, RawChange};
use crate::error::{FrigoError, FrigoResult};
use crate::invite::{Invite, InviteCode};
use crate::storage::Storage;
use crate::types::{
    Family, FamilyId, ItemId, ItemPatch, ListId, ListItem, Member, ShoppingList, UserId,
};

/// Row store and change feed sharing one database
#[derive(Clone)]
pub struct LocalBackend {
    storage: Storage,
    hub: ChangeHub,
}

impl LocalBackend {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> FrigoResult<Self> {
        Ok(Self::with_storage(Storage::new(path)?))
    }

    pub fn with_storage(storage: Storage) -> Self {
        Self {
            storage,
            hub: ChangeHub::new(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Families
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a family with `user_id` as its first member
    pub fn create_family_and_self(
        &self,
        user_id: &UserId,
        family_name: &str,
        display_name: &str,
    ) -> FrigoResult<Member> {
        let now = Utc::now();
        let family = Family {
            id: FamilyId::generate(),
            name: family_name.to_string(),
            created_at: now,
        };
        let member = Member {
            id: user_id.clone(),
            family_id: family.id.clone(),
            display_name: display_name.to_string(),
            joined_at: now,
        };
        self.storage.create_family_with_member(&family, &member)?;
        info!(family_id = %family.id, %user_id, "Family created");
        Ok(member)
    }

    pub fn member_for_user(&self, user_id: &UserId) -> FrigoResult<Option<Member>> {
        self.storage.load_member(user_id)
    }

    pub fn family(&self, family_id: &FamilyId) -> FrigoResult<Family> {
        self.storage
            .load_family(family_id)?
            .ok_or_else(|| FrigoError::FamilyNotFound(family_id.to_string()))
    }

    pub fn family_members(&self, family_id: &FamilyId) -> FrigoResult<Vec<Member>> {
        self.storage.members_of(family_id)
    }

    /// Issue a single-use invite code for a family
    pub fn create_invite(&self, family_id: &FamilyId, created_by: &UserId) -> FrigoResult<Invite> {
        // The family must exist before anyone can be invited into it.
        self.family(family_id)?;
        let invite = Invite::new(family_id.clone(), created_by.clone());
        self.storage.save_invite(&invite)?;
        info!(%family_id, code = %invite.code, "Invite created");
        Ok(invite)
    }

    /// Redeem an invite code, making `user_id` a member of its family
    pub fn accept_invite(
        &self,
        code: &InviteCode,
        user_id: &UserId,
        display_name: &str,
    ) -> FrigoResult<Member> {
        let member = self.storage.redeem_invite(code, user_id, display_name)?;
        info!(family_id = %member.family_id, %user_id, "Invite accepted");
        Ok(member)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lists
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_list(
        &self,
        family_id: &FamilyId,
        name: &str,
        created_by: &UserId,
    ) -> FrigoResult<ShoppingList> {
        self.family(family_id)?;
        let list = ShoppingList {
            id: ListId::generate(),
            name: name.to_string(),
            family_id: family_id.clone(),
            created_by: created_by.clone(),
            created_at: Utc::now(),
        };
        self.storage.save_list(&list)?;
        info!(list_id = %list.id, %family_id, "List created");
        Ok(list)
    }

    pub fn list(&self, list_id: &ListId) -> FrigoResult<ShoppingList> {
        self.storage
            .load_list(list_id)?
            .ok_or_else(|| FrigoError::ListNotFound(list_id.to_string()))
    }

    /// Lists of a family, newest first
    pub fn lists_for_family(&self, family_id: &FamilyId) -> FrigoResult<Vec<ShoppingList>> {
        self.storage.lists_for_family(family_id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Items
    // ═══════════════════════════════════════════════════════════════════════

    /// Store a new row and announce it to the list's subscribers
    pub fn insert_item(&self, item: &ListItem) -> FrigoResult<()> {
        self.storage.insert_item(item)?;
        let reached = self.hub.publish(&item.list_id, RawChange::insert(item)?);
        debug!(item_id = %item.id, list_id = %item.list_id, reached, "Item inserted");
        Ok(())
    }

    /// Apply a partial update and announce the full new row
    pub fn update_item(&self, item_id: &ItemId, patch: &ItemPatch) -> FrigoResult<ListItem> {
        let previous = self
            .storage
            .load_item(item_id)?
            .ok_or_else(|| FrigoError::ItemNotFound(item_id.to_string()))?;
        let mut item = previous.clone();
        patch.apply(&mut item);
        self.storage.save_item(&item)?;

        let reached = self
            .hub
            .publish(&item.list_id, RawChange::update(&item, Some(&previous))?);
        debug!(%item_id, list_id = %item.list_id, reached, "Item updated");
        Ok(item)
    }

    /// Flip the `checked` flag of an item
    pub fn toggle_item(&self, item_id: &ItemId) -> FrigoResult<ListItem> {
        let current = self
            .storage
            .load_item(item_id)?
            .ok_or_else(|| FrigoError::ItemNotFound(item_id.to_string()))?;
        self.update_item(item_id, &ItemPatch::checked(!current.checked))
    }

    /// Delete a row. Deleting a missing row is not an error and is not
    /// announced.
    pub fn delete_item(&self, item_id: &ItemId) -> FrigoResult<Option<ListItem>> {
        let removed = self.storage.delete_item(item_id)?;
        if let Some(item) = &removed {
            let reached = self.hub.publish(&item.list_id, RawChange::delete(&item.id));
            debug!(%item_id, list_id = %item.list_id, reached, "Item deleted");
        }
        Ok(removed)
    }

    pub fn item(&self, item_id: &ItemId) -> FrigoResult<Option<ListItem>> {
        self.storage.load_item(item_id)
    }
}

#[async_trait]
impl ItemStore for LocalBackend {
    async fn fetch_items(&self, list_id: &ListId) -> FrigoResult<Vec<ListItem>> {
        self.storage.items_for_list(list_id)
    }
}

#[async_trait]
impl ChangeFeed for LocalBackend {
    async fn subscribe(&self, list_id: &ListId) -> FrigoResult<FeedSubscription> {
        Ok(self.hub.subscribe(list_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_UNIT;
    use tempfile::TempDir;

    fn backend() -> (LocalBackend, TempDir) {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::open(temp.path().join("frigo.redb")).unwrap();
        (backend, temp)
    }

    fn new_item(list_id: &ListId, label: &str) -> ListItem {
        ListItem {
            id: ItemId::generate(),
            list_id: list_id.clone(),
            label: label.to_string(),
            qty: 1.0,
            unit: DEFAULT_UNIT.to_string(),
            checked: false,
            price: None,
            added_by: UserId::from("alice"),
            created_at: Utc::now(),
        }
    }

    fn setup_list(backend: &LocalBackend) -> ShoppingList {
        let alice = UserId::from("alice");
        let member = backend
            .create_family_and_self(&alice, "Dupont", "Alice")
            .unwrap();
        backend
            .create_list(&member.family_id, "Courses", &alice)
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_is_published_after_commit() {
        let (backend, _temp) = backend();
        let list = setup_list(&backend);
        let mut sub = backend.subscribe(&list.id).await.unwrap();

        let milk = new_item(&list.id, "Milk");
        backend.insert_item(&milk).unwrap();

        let change = sub.recv().await.unwrap();
        assert_eq!(change.event_type, "INSERT");
        assert_eq!(change.new["label"], "Milk");
        assert_eq!(backend.fetch_items(&list.id).await.unwrap(), vec![milk]);
    }

    #[tokio::test]
    async fn test_toggle_publishes_full_row() {
        let (backend, _temp) = backend();
        let list = setup_list(&backend);
        let milk = new_item(&list.id, "Milk");
        backend.insert_item(&milk).unwrap();

        let mut sub = backend.subscribe(&list.id).await.unwrap();
        let toggled = backend.toggle_item(&milk.id).unwrap();
        assert!(toggled.checked);

        let change = sub.recv().await.unwrap();
        assert_eq!(change.event_type, "UPDATE");
        assert_eq!(change.new["checked"], true);
        assert_eq!(change.new["label"], "Milk");
    }

    #[tokio::test]
    async fn test_delete_missing_item_is_silent() {
        let (backend, _temp) = backend();
        let list = setup_list(&backend);
        let _sub = backend.subscribe(&list.id).await.unwrap();

        assert!(backend.delete_item(&ItemId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn test_update_unknown_item_fails() {
        let (backend, _temp) = backend();
        let err = backend
            .update_item(&ItemId::from("nope"), &ItemPatch::checked(true))
            .unwrap_err();
        assert!(matches!(err, FrigoError::ItemNotFound(_)));
    }

    #[test]
    fn test_create_list_requires_family() {
        let (backend, _temp) = backend();
        let err = backend
            .create_list(&FamilyId::from("ghost"), "Courses", &UserId::from("alice"))
            .unwrap_err();
        assert!(matches!(err, FrigoError::FamilyNotFound(_)));
    }

    #[test]
    fn test_invite_flow() {
        let (backend, _temp) = backend();
        let alice = UserId::from("alice");
        let member = backend
            .create_family_and_self(&alice, "Dupont", "Alice")
            .unwrap();

        let invite = backend.create_invite(&member.family_id, &alice).unwrap();
        let bob = backend
            .accept_invite(&invite.code, &UserId::from("bob"), "Bob")
            .unwrap();

        assert_eq!(bob.family_id, member.family_id);
        let names: Vec<_> = backend
            .family_members(&member.family_id)
            .unwrap()
            .into_iter()
            .map(|m| m.display_name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }
}
