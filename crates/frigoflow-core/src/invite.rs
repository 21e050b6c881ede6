//! Family invite codes
//!
//! An invite code lets a new member join an existing family. Codes are
//! short enough to read aloud: eight characters from an alphabet without
//! look-alikes (no `0/O`, `1/I/L`). Each code can be redeemed once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::FrigoError;
use crate::types::{FamilyId, UserId};

/// Characters an invite code is drawn from
const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of every invite code
pub const CODE_LEN: usize = 8;

/// A normalized invite code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InviteCode(String);

impl InviteCode {
    /// Generate a new random code
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..CODE_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InviteCode {
    type Err = FrigoError;

    /// Parse user input; surrounding whitespace and case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        if normalized.len() != CODE_LEN {
            return Err(FrigoError::InvalidInvite(format!(
                "expected {} characters, got {}",
                CODE_LEN,
                normalized.len()
            )));
        }
        if let Some(bad) = normalized.bytes().find(|b| !ALPHABET.contains(b)) {
            return Err(FrigoError::InvalidInvite(format!(
                "unexpected character '{}'",
                bad as char
            )));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for InviteCode {
    type Error = FrigoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InviteCode> for String {
    fn from(code: InviteCode) -> Self {
        code.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored invite row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub code: InviteCode,
    pub family_id: FamilyId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// Set once the invite has been redeemed
    #[serde(default)]
    pub used_by: Option<UserId>,
}

impl Invite {
    pub fn new(family_id: FamilyId, created_by: UserId) -> Self {
        Self {
            code: InviteCode::generate(),
            family_id,
            created_by,
            created_at: Utc::now(),
            used_by: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used_by.is_some()
    }
}
