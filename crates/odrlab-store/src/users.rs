//! CRUD operations for base [`User`] records.
//!
//! Role-specific extension data is handled in [`crate::profiles`]; the
//! operations here only touch the `users` table, except for account creation
//! and deletion which are transactional across tables.

use rusqlite::params;
use uuid::Uuid;

use crate::database::{col_timestamp, col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{RoleProfile, User, UserRole};
use crate::profiles;

pub(crate) const USER_COLS: &str =
    "id, name, email, password_hash, contact_number, city, country, image_avatar, role, \
     created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user together with its role-extension row.
    ///
    /// The insert and the extension write share one transaction, so a user
    /// never exists without the extension row matching its role.  Admins
    /// carry no extension row and must be created with `profile = None`.
    pub fn create_user(&mut self, user: &User, profile: Option<&RoleProfile>) -> Result<()> {
        if let Some(profile) = profile {
            if profile.role() != user.role {
                return Err(StoreError::RoleMismatch);
            }
        }

        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO users (id, name, email, password_hash, contact_number, city, country,
                                image_avatar, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.contact_number,
                user.city,
                user.country,
                user.image_avatar,
                user.role.as_str(),
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(map_email_conflict)?;

        if let Some(profile) = profile {
            profiles::insert_profile(&tx, user.id, profile)?;
        }

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by id.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Fetch a single user by email.  The caller is expected to normalize
    /// (lower-case, trim) before lookup; the column stores normalized values.
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// List all users, newest first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT {USER_COLS} FROM users ORDER BY created_at DESC"
            ))?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update the mutable base fields of a user (name, contact details,
    /// avatar).  Email, password and role are managed by dedicated paths.
    pub fn update_user(&self, user: &User) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users
             SET name = ?1, contact_number = ?2, city = ?3, country = ?4,
                 image_avatar = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                user.name,
                user.contact_number,
                user.city,
                user.country,
                user.image_avatar,
                user.updated_at.to_rfc3339(),
                user.id.to_string(),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user and everything they own.
    ///
    /// Owned ideas and submissions are removed first (their comments, likes
    /// and membership rows cascade), then the user row itself, whose cascade
    /// covers the extension rows and any activity on other users' ideas.
    /// Returns `true` if a user row was deleted.
    pub fn delete_user(&mut self, id: Uuid) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "DELETE FROM ideas WHERE owner_id = ?1",
            params![id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM idea_submissions WHERE owner_id = ?1",
            params![id.to_string()],
        )?;
        let affected = tx.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;

        tx.commit()?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` (in `USER_COLS` order) to a [`User`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let role_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    let role = UserRole::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown user role: {role_str}").into(),
        )
    })?;

    Ok(User {
        id: col_uuid(0, &id_str)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        contact_number: row.get(4)?,
        city: row.get(5)?,
        country: row.get(6)?,
        image_avatar: row.get(7)?,
        role,
        created_at: col_timestamp(9, &created_str)?,
        updated_at: col_timestamp(10, &updated_str)?,
    })
}

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Translate a unique-constraint violation on `users.email` into
/// [`StoreError::EmailTaken`].
fn map_email_conflict(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("users.email") =>
        {
            StoreError::EmailTaken
        }
        _ => StoreError::Sqlite(e),
    }
}
