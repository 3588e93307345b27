//! Shared helpers for the crate's test modules.

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::models::{User, UserRole};
use crate::Database;

/// Open a fresh on-disk database in a temp directory.  The returned guard
/// must be kept alive for the duration of the test.
pub(crate) fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::open_at(&path).unwrap();
    (db, dir)
}

pub(crate) fn sample_user(email: &str, role: UserRole) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Test User".to_string(),
        email: email.to_string(),
        password_hash: Some("$argon2id$fake".to_string()),
        contact_number: None,
        city: None,
        country: None,
        image_avatar: None,
        role,
        created_at: now,
        updated_at: now,
    }
}
