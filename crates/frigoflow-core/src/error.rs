//! Error types for FrigoFlow

use thiserror::Error;

/// Main error type for FrigoFlow operations
#[derive(Error, Debug)]
pub enum FrigoError {
    /// Shopping list was not found
    #[error("List not found: {0}")]
    ListNotFound(String),

    /// List item was not found
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Family was not found
    #[error("Family not found: {0}")]
    FamilyNotFound(String),

    /// The user has no family membership yet
    #[error("Not a family member: {0}")]
    NotAMember(String),

    /// The user already belongs to a family
    #[error("Already a member of family {0}")]
    AlreadyMember(String),

    /// Invite code is malformed, unknown, or already used
    #[error("Invalid invite: {0}")]
    InvalidInvite(String),

    /// Rejected user input (empty label, non-positive quantity, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No user identity attached to the session
    #[error("Not signed in")]
    NotSignedIn,

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network-related error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using FrigoError
pub type FrigoResult<T> = Result<T, FrigoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrigoError::ListNotFound("abc".to_string());
        assert_eq!(format!("{}", err), "List not found: abc");
        assert_eq!(format!("{}", FrigoError::NotSignedIn), "Not signed in");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FrigoError = io_err.into();
        assert!(matches!(err, FrigoError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: FrigoError = json_err.into();
        assert!(matches!(err, FrigoError::Serialization(_)));
    }
}
