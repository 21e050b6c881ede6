//! Session handle and the list actions built on it
//!
//! A [`Session`] is the explicit replacement for a process-wide backend
//! client: it is opened once, passed to whoever needs it, and carries the
//! identity of the signed-in user (if any).

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::backend::LocalBackend;
use crate::config::FrigoConfig;
use crate::error::{FrigoError, FrigoResult};
use crate::invite::{Invite, InviteCode};
use crate::sync::ListSynchronizer;
use crate::types::{
    Family, FamilyId, ItemId, ItemPatch, ListId, ListItem, ListSummary, Member, NewItem,
    ShoppingList, UserId, DEFAULT_UNIT,
};

/// Database file inside the data directory
pub const DATABASE_FILE: &str = "frigoflow.redb";

/// Where a user should land when the application starts
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// No signed-in user
    NeedsAuth,
    /// Signed in, but not part of any family yet
    NeedsOnboarding,
    /// Ready to use the family's lists
    Ready { member: Member, family_id: FamilyId },
}

pub struct Session {
    backend: Arc<LocalBackend>,
    user: Option<UserId>,
    config: FrigoConfig,
}

impl Session {
    pub fn new(backend: Arc<LocalBackend>, user: Option<UserId>, config: FrigoConfig) -> Self {
        Self {
            backend,
            user,
            config,
        }
    }

    /// Open the data directory: configuration plus local database
    pub fn open(data_dir: impl AsRef<Path>, user: Option<UserId>) -> FrigoResult<Self> {
        let data_dir = data_dir.as_ref();
        let config = FrigoConfig::load(data_dir)?;
        let backend = LocalBackend::open(data_dir.join(DATABASE_FILE))?;
        Ok(Self::new(Arc::new(backend), user, config))
    }

    pub fn backend(&self) -> &Arc<LocalBackend> {
        &self.backend
    }

    pub fn config(&self) -> &FrigoConfig {
        &self.config
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    fn require_user(&self) -> FrigoResult<&UserId> {
        self.user.as_ref().ok_or(FrigoError::NotSignedIn)
    }

    /// Decide where the user should go. Lookup failures are treated as
    /// "no membership" rather than surfaced.
    pub fn bootstrap(&self) -> BootstrapOutcome {
        let Some(user) = &self.user else {
            return BootstrapOutcome::NeedsAuth;
        };
        match self.backend.member_for_user(user) {
            Ok(Some(member)) => {
                let family_id = member.family_id.clone();
                BootstrapOutcome::Ready { member, family_id }
            }
            Ok(None) => BootstrapOutcome::NeedsOnboarding,
            Err(e) => {
                warn!(%user, error = %e, "Membership lookup failed");
                BootstrapOutcome::NeedsOnboarding
            }
        }
    }

    /// Membership of the signed-in user
    pub fn member(&self) -> FrigoResult<Member> {
        let user = self.require_user()?;
        self.backend
            .member_for_user(user)?
            .ok_or_else(|| FrigoError::NotAMember(user.to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Family & Invites
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_family(&self, family_name: &str, display_name: &str) -> FrigoResult<Member> {
        let user = self.require_user()?;
        let family_name = non_empty(family_name, "family name")?;
        let display_name = non_empty(display_name, "display name")?;
        self.backend
            .create_family_and_self(user, family_name, display_name)
    }

    pub fn create_invite(&self) -> FrigoResult<Invite> {
        let member = self.member()?;
        self.backend.create_invite(&member.family_id, &member.id)
    }

    pub fn accept_invite(&self, code: &str, display_name: &str) -> FrigoResult<Member> {
        let user = self.require_user()?;
        let code: InviteCode = code.parse()?;
        let display_name = non_empty(display_name, "display name")?;
        self.backend.accept_invite(&code, user, display_name)
    }

    /// The user's family and everyone in it
    pub fn family(&self) -> FrigoResult<(Family, Vec<Member>)> {
        let member = self.member()?;
        let family = self.backend.family(&member.family_id)?;
        let members = self.backend.family_members(&member.family_id)?;
        Ok((family, members))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lists
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_list(&self, name: &str) -> FrigoResult<ShoppingList> {
        let member = self.member()?;
        let name = non_empty(name, "list name")?;
        self.backend.create_list(&member.family_id, name, &member.id)
    }

    /// The family's lists, newest first, with item counters
    pub fn lists(&self) -> FrigoResult<Vec<ListSummary>> {
        let member = self.member()?;
        let lists = self.backend.lists_for_family(&member.family_id)?;

        let mut summaries = Vec::with_capacity(lists.len());
        for list in lists {
            // A list whose items can't be read still shows up, just empty.
            let items = match self.backend.storage().items_for_list(&list.id) {
                Ok(items) => items,
                Err(e) => {
                    warn!(list_id = %list.id, error = %e, "Item count failed");
                    Vec::new()
                }
            };
            summaries.push(ListSummary {
                items: items.len(),
                checked_items: checked_count(&items),
                list,
            });
        }
        Ok(summaries)
    }

    /// A list of the user's family
    pub fn list(&self, list_id: &ListId) -> FrigoResult<ShoppingList> {
        let member = self.member()?;
        let list = self.backend.list(list_id)?;
        if list.family_id != member.family_id {
            return Err(FrigoError::ListNotFound(list_id.to_string()));
        }
        Ok(list)
    }

    /// Start a realtime mirror of one list
    pub fn watch_list(&self, list_id: &ListId) -> ListSynchronizer {
        ListSynchronizer::watch(self.backend.clone(), list_id.clone(), self.config.ordering)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Items
    // ═══════════════════════════════════════════════════════════════════════

    /// Validate and insert a new item
    pub fn add_item(&self, list_id: &ListId, new: NewItem) -> FrigoResult<ListItem> {
        let list = self.list(list_id)?;
        let user = self.require_user()?;

        let label = valid_label(&new.label)?;
        valid_qty(new.qty)?;
        valid_price(new.price)?;
        let unit = new.unit.as_deref().map_or(DEFAULT_UNIT, unit_or_default);

        let item = ListItem {
            id: ItemId::generate(),
            list_id: list.id,
            label: label.to_string(),
            qty: new.qty,
            unit: unit.to_string(),
            checked: false,
            price: new.price,
            added_by: user.clone(),
            created_at: Utc::now(),
        };
        self.backend.insert_item(&item)?;
        debug!(item_id = %item.id, label = %item.label, "Item added");
        Ok(item)
    }

    pub fn toggle_item(&self, item_id: &ItemId) -> FrigoResult<ListItem> {
        self.own_item(item_id)?;
        self.backend.toggle_item(item_id)
    }

    /// Apply a partial update; patched fields obey the same rules as
    /// [`add_item`](Self::add_item).
    pub fn update_item(&self, item_id: &ItemId, patch: &ItemPatch) -> FrigoResult<ListItem> {
        self.own_item(item_id)?;
        let patch = valid_patch(patch)?;
        self.backend.update_item(item_id, &patch)
    }

    pub fn delete_item(&self, item_id: &ItemId) -> FrigoResult<()> {
        self.own_item(item_id)?;
        self.backend.delete_item(item_id)?;
        Ok(())
    }

    /// An item on one of the user's family lists
    fn own_item(&self, item_id: &ItemId) -> FrigoResult<ListItem> {
        let item = self
            .backend
            .item(item_id)?
            .ok_or_else(|| FrigoError::ItemNotFound(item_id.to_string()))?;
        self.list(&item.list_id)
            .map_err(|_| FrigoError::ItemNotFound(item_id.to_string()))?;
        Ok(item)
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> FrigoResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FrigoError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed)
}

// ═══════════════════════════════════════════════════════════════════════════
// Item validation
// ═══════════════════════════════════════════════════════════════════════════

fn valid_label(label: &str) -> FrigoResult<&str> {
    non_empty(label, "label")
}

fn valid_qty(qty: f64) -> FrigoResult<()> {
    if !qty.is_finite() || qty <= 0.0 {
        return Err(FrigoError::InvalidInput(format!(
            "quantity must be positive, got {}",
            qty
        )));
    }
    Ok(())
}

fn valid_price(price: Option<f64>) -> FrigoResult<()> {
    match price {
        Some(price) if !price.is_finite() || price < 0.0 => Err(FrigoError::InvalidInput(
            format!("price must not be negative, got {}", price),
        )),
        _ => Ok(()),
    }
}

/// Blank units fall back to [`DEFAULT_UNIT`]
fn unit_or_default(unit: &str) -> &str {
    match unit.trim() {
        "" => DEFAULT_UNIT,
        trimmed => trimmed,
    }
}

/// Check a patch and normalize its text fields
fn valid_patch(patch: &ItemPatch) -> FrigoResult<ItemPatch> {
    let label = match &patch.label {
        Some(label) => Some(valid_label(label)?.to_string()),
        None => None,
    };
    if let Some(qty) = patch.qty {
        valid_qty(qty)?;
    }
    if let Some(price) = patch.price {
        valid_price(price)?;
    }
    Ok(ItemPatch {
        label,
        unit: patch.unit.as_deref().map(|u| unit_or_default(u).to_string()),
        ..patch.clone()
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// List arithmetic
// ═══════════════════════════════════════════════════════════════════════════

/// Σ price × quantity, items without a price count as zero
pub fn list_total(items: &[ListItem]) -> f64 {
    items.iter().map(ListItem::line_total).sum()
}

pub fn checked_count(items: &[ListItem]) -> usize {
    items.iter().filter(|item| item.checked).count()
}

/// Share of checked items in percent; 0 for an empty list
pub fn progress(items: &[ListItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    checked_count(items) as f64 / items.len() as f64 * 100.0
}

pub fn format_price(amount: f64) -> String {
    format!("CHF {:.2}", amount)
}
