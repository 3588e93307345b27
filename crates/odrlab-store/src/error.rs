use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// An account already exists for the given email address.
    #[error("Email address already registered")]
    EmailTaken,

    /// The (user, idea) membership row already exists.
    #[error("User is already a {0} on this idea")]
    AlreadyMember(&'static str),

    /// A review was attempted on a record that has already been reviewed.
    #[error("Record has already been reviewed")]
    AlreadyReviewed,

    /// A comment reply referenced a parent on a different idea.
    #[error("Parent comment belongs to a different idea")]
    InvalidParent,

    /// The supplied profile does not match the user's role.
    #[error("Profile does not match user role")]
    RoleMismatch,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
