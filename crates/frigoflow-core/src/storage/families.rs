//! Family Storage - families, memberships and invite codes
//!
//! Family creation and invite redemption touch several tables and run in a
//! single write transaction each.

use crate::error::FrigoError;
use crate::invite::{Invite, InviteCode};
use crate::types::{Family, FamilyId, Member, UserId};
use redb::{ReadableTable, TableDefinition};

use super::Storage;

/// Table for families (key: family id, value: JSON Family)
pub(crate) const FAMILIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("families");

/// Table for memberships (key: user id, value: JSON Member)
pub(crate) const MEMBERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("members");

/// Table for invite codes (key: code, value: JSON Invite)
pub(crate) const INVITES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("invites");

impl Storage {
    // ═══════════════════════════════════════════════════════════════════════
    // Family Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a family and its first member atomically.
    ///
    /// Fails with `AlreadyMember` if the user already belongs to a family.
    pub fn create_family_with_member(
        &self,
        family: &Family,
        member: &Member,
    ) -> Result<(), FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut members = write_txn.open_table(MEMBERS_TABLE)?;
            if let Some(existing) = members.get(member.id.as_str())? {
                let existing: Member = serde_json::from_slice(existing.value())?;
                return Err(FrigoError::AlreadyMember(existing.family_id.to_string()));
            }

            let mut families = write_txn.open_table(FAMILIES_TABLE)?;
            let data = serde_json::to_vec(family)?;
            families.insert(family.id.as_str(), data.as_slice())?;

            let data = serde_json::to_vec(member)?;
            members.insert(member.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a family by id
    pub fn load_family(&self, family_id: &FamilyId) -> Result<Option<Family>, FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(FAMILIES_TABLE)?;

        match table.get(family_id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Member Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Load the membership of a user
    ///
    /// Returns `None` if the user has not joined a family yet.
    pub fn load_member(&self, user_id: &UserId) -> Result<Option<Member>, FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(MEMBERS_TABLE)?;

        match table.get(user_id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// All members of a family, in joining order
    pub fn members_of(&self, family_id: &FamilyId) -> Result<Vec<Member>, FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(MEMBERS_TABLE)?;

        let mut members = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let member: Member = serde_json::from_slice(value.value())?;
            if &member.family_id == family_id {
                members.push(member);
            }
        }
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(members)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Invite Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Save an invite code
    pub fn save_invite(&self, invite: &Invite) -> Result<(), FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(INVITES_TABLE)?;
            let data = serde_json::to_vec(invite)?;
            table.insert(invite.code.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load an invite by code
    pub fn load_invite(&self, code: &InviteCode) -> Result<Option<Invite>, FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(INVITES_TABLE)?;

        match table.get(code.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Redeem an invite: mark it used and insert the new member.
    ///
    /// The member's `family_id` is taken from the invite. Fails if the code
    /// is unknown or used, or if the user is already in a family.
    pub fn redeem_invite(
        &self,
        code: &InviteCode,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<Member, FrigoError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let member = {
            let mut invites = write_txn.open_table(INVITES_TABLE)?;
            let mut invite: Invite = match invites.get(code.as_str())? {
                Some(v) => serde_json::from_slice(v.value())?,
                None => return Err(FrigoError::InvalidInvite(format!("unknown code {}", code))),
            };
            if invite.is_used() {
                return Err(FrigoError::InvalidInvite(format!("code {} already used", code)));
            }

            let mut members = write_txn.open_table(MEMBERS_TABLE)?;
            if let Some(existing) = members.get(user_id.as_str())? {
                let existing: Member = serde_json::from_slice(existing.value())?;
                return Err(FrigoError::AlreadyMember(existing.family_id.to_string()));
            }

            let member = Member {
                id: user_id.clone(),
                family_id: invite.family_id.clone(),
                display_name: display_name.to_string(),
                joined_at: chrono::Utc::now(),
            };
            let data = serde_json::to_vec(&member)?;
            members.insert(member.id.as_str(), data.as_slice())?;

            invite.used_by = Some(user_id.clone());
            let data = serde_json::to_vec(&invite)?;
            invites.insert(code.as_str(), data.as_slice())?;

            member
        };
        write_txn.commit()?;
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("test.redb")).unwrap();
        (storage, temp_dir)
    }

    fn family(name: &str) -> Family {
        Family {
            id: FamilyId::generate(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    fn member(user: &str, family_id: &FamilyId) -> Member {
        Member {
            id: UserId::from(user),
            family_id: family_id.clone(),
            display_name: user.to_string(),
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_family_with_member() {
        let (storage, _temp) = create_test_storage();
        let fam = family("Dupont");
        storage
            .create_family_with_member(&fam, &member("alice", &fam.id))
            .unwrap();

        assert_eq!(storage.load_family(&fam.id).unwrap().unwrap().name, "Dupont");
        let alice = storage.load_member(&UserId::from("alice")).unwrap().unwrap();
        assert_eq!(alice.family_id, fam.id);
    }

    #[test]
    fn test_second_family_for_same_user_is_rejected() {
        let (storage, _temp) = create_test_storage();
        let first = family("First");
        let second = family("Second");
        storage
            .create_family_with_member(&first, &member("alice", &first.id))
            .unwrap();

        let err = storage
            .create_family_with_member(&second, &member("alice", &second.id))
            .unwrap_err();
        assert!(matches!(err, FrigoError::AlreadyMember(_)));
        assert!(storage.load_family(&second.id).unwrap().is_none());
    }

    #[test]
    fn test_redeem_invite_once() {
        let (storage, _temp) = create_test_storage();
        let fam = family("Dupont");
        storage
            .create_family_with_member(&fam, &member("alice", &fam.id))
            .unwrap();
        let invite = Invite::new(fam.id.clone(), UserId::from("alice"));
        storage.save_invite(&invite).unwrap();

        let bob = storage
            .redeem_invite(&invite.code, &UserId::from("bob"), "Bob")
            .unwrap();
        assert_eq!(bob.family_id, fam.id);
        assert_eq!(storage.members_of(&fam.id).unwrap().len(), 2);

        let err = storage
            .redeem_invite(&invite.code, &UserId::from("carol"), "Carol")
            .unwrap_err();
        assert!(matches!(err, FrigoError::InvalidInvite(_)));
        assert!(storage.load_member(&UserId::from("carol")).unwrap().is_none());
    }

    #[test]
    fn test_redeem_unknown_invite() {
        let (storage, _temp) = create_test_storage();
        let err = storage
            .redeem_invite(&InviteCode::generate(), &UserId::from("bob"), "Bob")
            .unwrap_err();
        assert!(matches!(err, FrigoError::InvalidInvite(_)));
    }

    #[test]
    fn test_member_cannot_redeem_into_second_family() {
        let (storage, _temp) = create_test_storage();
        let fam = family("Dupont");
        storage
            .create_family_with_member(&fam, &member("alice", &fam.id))
            .unwrap();
        let invite = Invite::new(fam.id.clone(), UserId::from("alice"));
        storage.save_invite(&invite).unwrap();

        let err = storage
            .redeem_invite(&invite.code, &UserId::from("alice"), "Alice")
            .unwrap_err();
        assert!(matches!(err, FrigoError::AlreadyMember(_)));
        assert!(!storage.load_invite(&invite.code).unwrap().unwrap().is_used());
    }
}
