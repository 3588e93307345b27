//! Role-extension storage: the polymorphic half of the identity model.
//!
//! Exactly one extension row matching the user's current role exists after any
//! profile or role-transition operation; every transition deletes stale rows
//! and writes the new row in a single transaction.  The one sanctioned
//! exception is a mentor application (`mentors.approved = 0`), which may
//! coexist with the current role's row until an admin reviews it.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::database::{col_timestamp_opt, col_uuid_opt, Database};
use crate::error::{Result, StoreError};
use crate::models::{
    FacultyProfile, InnovatorProfile, MentorProfile, MentorType, OtherProfile, RoleProfile, User,
    UserRole,
};
use crate::users::row_to_user;

/// Extension table for a role.  `None` for admins, who carry no extension row.
/// The exhaustive match is the single place the role-to-table mapping lives.
pub(crate) fn extension_table(role: UserRole) -> Option<&'static str> {
    match role {
        UserRole::Admin => None,
        UserRole::Innovator => Some("innovators"),
        UserRole::Mentor => Some("mentors"),
        UserRole::Faculty => Some("faculties"),
        UserRole::Other => Some("others"),
    }
}

const EXTENSION_ROLES: [UserRole; 4] = [
    UserRole::Innovator,
    UserRole::Mentor,
    UserRole::Faculty,
    UserRole::Other,
];

impl Database {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch the extension row for `user_id` in the table matching `role`.
    ///
    /// Returns `Ok(None)` when no row exists (the effective profile simply
    /// omits those fields) and for admins.
    pub fn get_profile(&self, user_id: Uuid, role: UserRole) -> Result<Option<RoleProfile>> {
        let conn = self.conn();
        let id = user_id.to_string();

        let profile = match role {
            UserRole::Admin => None,
            UserRole::Innovator => conn
                .query_row(
                    "SELECT institution, highest_education, course_name, course_status, description
                     FROM innovators WHERE user_id = ?1",
                    params![id],
                    row_to_innovator,
                )
                .optional()?
                .map(RoleProfile::Innovator),
            UserRole::Mentor => get_mentor_row(conn, user_id)?.map(RoleProfile::Mentor),
            UserRole::Faculty => conn
                .query_row(
                    "SELECT institution, role, expertise, course, mentoring, description
                     FROM faculties WHERE user_id = ?1",
                    params![id],
                    row_to_faculty,
                )
                .optional()?
                .map(RoleProfile::Faculty),
            UserRole::Other => conn
                .query_row(
                    "SELECT role, workplace, description FROM others WHERE user_id = ?1",
                    params![id],
                    row_to_other,
                )
                .optional()?
                .map(RoleProfile::Other),
        };

        Ok(profile)
    }

    /// Fetch a user together with its effective profile: the extension row
    /// matching the user's *current* role, never a stale one.
    pub fn get_user_with_profile(&self, id: Uuid) -> Result<(User, Option<RoleProfile>)> {
        let user = self.get_user(id)?;
        let profile = self.get_profile(id, user.role)?;
        Ok((user, profile))
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Upsert the extension record for a user, transitioning the role if the
    /// profile belongs to a different one.
    ///
    /// Runs in one transaction: the role discriminator flip, the deletion of
    /// every stale extension row (including any pending mentor application)
    /// and the new row's write succeed or fail together.
    pub fn replace_profile(&mut self, user_id: Uuid, profile: &RoleProfile) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                profile.role().as_str(),
                Utc::now().to_rfc3339(),
                user_id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        clear_profiles_except(&tx, user_id, Some(profile.role()))?;
        insert_profile(&tx, user_id, profile)?;

        tx.commit()?;
        Ok(())
    }

    /// Promote a user to ADMIN.  Admins carry no extension row, so every
    /// extension row is removed in the same transaction as the role flip.
    pub fn promote_to_admin(&mut self, user_id: Uuid) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                UserRole::Admin.as_str(),
                Utc::now().to_rfc3339(),
                user_id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        clear_profiles_except(&tx, user_id, None)?;

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mentor application lifecycle
    // ------------------------------------------------------------------

    /// File (or re-file) a mentor application.
    ///
    /// Writes a `mentors` row with `approved = false` and cleared review
    /// fields; the user's top-level role is untouched until an admin decides.
    pub fn apply_mentor(&self, user_id: Uuid, application: &MentorProfile) -> Result<()> {
        // Reject applications for unknown users up front; the FK would also
        // catch this but with a less useful error.
        self.get_user(user_id)?;

        self.conn().execute(
            "INSERT OR REPLACE INTO mentors
                 (user_id, mentor_type, organization, role, expertise, description,
                  approved, rejection_reason, reviewed_at, reviewed_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, NULL, NULL)",
            params![
                user_id.to_string(),
                application.mentor_type.as_str(),
                application.organization,
                application.role,
                application.expertise,
                application.description,
            ],
        )?;
        Ok(())
    }

    /// Fetch the mentor row for a user regardless of the user's current role.
    pub fn get_mentor_application(&self, user_id: Uuid) -> Result<Option<MentorProfile>> {
        get_mentor_row(self.conn(), user_id)
    }

    /// List users with an unreviewed mentor application, oldest account first.
    pub fn list_pending_mentor_applications(&self) -> Result<Vec<(User, MentorProfile)>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLS_PREFIXED}, {MENTOR_COLS_PREFIXED}
             FROM mentors m
             JOIN users u ON u.id = m.user_id
             WHERE m.approved = 0 AND m.reviewed_at IS NULL
             ORDER BY u.created_at ASC"
        ))?;

        let rows = stmt.query_map([], |row| {
            let user = row_to_user(row)?;
            let mentor = row_to_mentor_at(row, 11)?;
            Ok((user, mentor))
        })?;

        let mut applications = Vec::new();
        for row in rows {
            applications.push(row?);
        }
        Ok(applications)
    }

    /// Approve a pending mentor application.
    ///
    /// Flips the user's role to MENTOR, marks the mentor row approved with
    /// the review metadata, and deletes every other extension row, all in one
    /// transaction.  Fails with [`StoreError::AlreadyReviewed`] if the
    /// application has already been decided.
    pub fn approve_mentor(&mut self, user_id: Uuid, reviewer: Uuid) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let mentor = get_mentor_row(&tx, user_id)?.ok_or(StoreError::NotFound)?;
        if mentor.approved || mentor.reviewed_at.is_some() {
            return Err(StoreError::AlreadyReviewed);
        }

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE mentors
             SET approved = 1, rejection_reason = NULL, reviewed_at = ?1, reviewed_by = ?2
             WHERE user_id = ?3",
            params![now, reviewer.to_string(), user_id.to_string()],
        )?;

        let affected = tx.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![UserRole::Mentor.as_str(), now, user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        clear_profiles_except(&tx, user_id, Some(UserRole::Mentor))?;

        tx.commit()?;
        Ok(())
    }

    /// Reject a pending mentor application.
    ///
    /// Records the decision on the mentor row (kept as the application
    /// ledger), flips the role back to OTHER and ensures an `others` row
    /// exists carrying a human-readable trace of the rejected mentor type,
    /// all in one transaction.
    pub fn reject_mentor(&mut self, user_id: Uuid, reviewer: Uuid, reason: &str) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let mentor = get_mentor_row(&tx, user_id)?.ok_or(StoreError::NotFound)?;
        if mentor.approved || mentor.reviewed_at.is_some() {
            return Err(StoreError::AlreadyReviewed);
        }

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE mentors
             SET rejection_reason = ?1, reviewed_at = ?2, reviewed_by = ?3
             WHERE user_id = ?4",
            params![reason, now, reviewer.to_string(), user_id.to_string()],
        )?;

        let affected = tx.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![UserRole::Other.as_str(), now, user_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tx.execute(
            "INSERT OR REPLACE INTO others (user_id, role, workplace, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.to_string(),
                format!(
                    "Rejected mentor applicant ({})",
                    mentor.mentor_type.as_str()
                ),
                mentor.organization,
                mentor.description,
            ],
        )?;

        // Keep the mentors row (application record) and the new others row.
        tx.execute(
            "DELETE FROM innovators WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM faculties WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shared transaction helpers
// ---------------------------------------------------------------------------

const MENTOR_COLS: &str = "mentor_type, organization, role, expertise, description, approved, \
                           rejection_reason, reviewed_at, reviewed_by";
const MENTOR_COLS_PREFIXED: &str =
    "m.mentor_type, m.organization, m.role, m.expertise, m.description, m.approved, \
     m.rejection_reason, m.reviewed_at, m.reviewed_by";
const USER_COLS_PREFIXED: &str =
    "u.id, u.name, u.email, u.password_hash, u.contact_number, u.city, u.country, \
     u.image_avatar, u.role, u.created_at, u.updated_at";

/// Insert (or replace) the extension row for `profile` in its role's table.
pub(crate) fn insert_profile(
    conn: &Connection,
    user_id: Uuid,
    profile: &RoleProfile,
) -> Result<()> {
    let id = user_id.to_string();

    match profile {
        RoleProfile::Innovator(p) => {
            conn.execute(
                "INSERT OR REPLACE INTO innovators
                     (user_id, institution, highest_education, course_name, course_status,
                      description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    p.institution,
                    p.highest_education,
                    p.course_name,
                    p.course_status,
                    p.description,
                ],
            )?;
        }
        RoleProfile::Mentor(p) => {
            conn.execute(
                "INSERT OR REPLACE INTO mentors
                     (user_id, mentor_type, organization, role, expertise, description,
                      approved, rejection_reason, reviewed_at, reviewed_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    p.mentor_type.as_str(),
                    p.organization,
                    p.role,
                    p.expertise,
                    p.description,
                    p.approved,
                    p.rejection_reason,
                    p.reviewed_at.map(|t| t.to_rfc3339()),
                    p.reviewed_by.map(|u| u.to_string()),
                ],
            )?;
        }
        RoleProfile::Faculty(p) => {
            conn.execute(
                "INSERT OR REPLACE INTO faculties
                     (user_id, institution, role, expertise, course, mentoring, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    p.institution,
                    p.role,
                    p.expertise,
                    p.course,
                    p.mentoring,
                    p.description,
                ],
            )?;
        }
        RoleProfile::Other(p) => {
            conn.execute(
                "INSERT OR REPLACE INTO others (user_id, role, workplace, description)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, p.role, p.workplace, p.description],
            )?;
        }
    }

    Ok(())
}

/// Delete every extension row for `user_id` except the one belonging to
/// `keep`.  Passing `None` clears all four tables.
pub(crate) fn clear_profiles_except(
    conn: &Connection,
    user_id: Uuid,
    keep: Option<UserRole>,
) -> Result<()> {
    let id = user_id.to_string();

    for role in EXTENSION_ROLES {
        if Some(role) == keep {
            continue;
        }
        if let Some(table) = extension_table(role) {
            conn.execute(&format!("DELETE FROM {table} WHERE user_id = ?1"), params![id])?;
        }
    }

    Ok(())
}

fn get_mentor_row(conn: &Connection, user_id: Uuid) -> Result<Option<MentorProfile>> {
    Ok(conn
        .query_row(
            &format!("SELECT {MENTOR_COLS} FROM mentors WHERE user_id = ?1"),
            params![user_id.to_string()],
            |row| row_to_mentor_at(row, 0),
        )
        .optional()?)
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------

fn row_to_innovator(row: &rusqlite::Row<'_>) -> rusqlite::Result<InnovatorProfile> {
    Ok(InnovatorProfile {
        institution: row.get(0)?,
        highest_education: row.get(1)?,
        course_name: row.get(2)?,
        course_status: row.get(3)?,
        description: row.get(4)?,
    })
}

/// Map a mentor row starting at column `base` (supports joined queries).
fn row_to_mentor_at(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<MentorProfile> {
    let type_str: String = row.get(base)?;
    let mentor_type = MentorType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            base,
            rusqlite::types::Type::Text,
            format!("unknown mentor type: {type_str}").into(),
        )
    })?;

    let reviewed_at: Option<String> = row.get(base + 7)?;
    let reviewed_by: Option<String> = row.get(base + 8)?;

    Ok(MentorProfile {
        mentor_type,
        organization: row.get(base + 1)?,
        role: row.get(base + 2)?,
        expertise: row.get(base + 3)?,
        description: row.get(base + 4)?,
        approved: row.get(base + 5)?,
        rejection_reason: row.get(base + 6)?,
        reviewed_at: col_timestamp_opt(base + 7, reviewed_at)?,
        reviewed_by: col_uuid_opt(base + 8, reviewed_by)?,
    })
}

fn row_to_faculty(row: &rusqlite::Row<'_>) -> rusqlite::Result<FacultyProfile> {
    Ok(FacultyProfile {
        institution: row.get(0)?,
        role: row.get(1)?,
        expertise: row.get(2)?,
        course: row.get(3)?,
        mentoring: row.get(4)?,
        description: row.get(5)?,
    })
}

fn row_to_other(row: &rusqlite::Row<'_>) -> rusqlite::Result<OtherProfile> {
    Ok(OtherProfile {
        role: row.get(0)?,
        workplace: row.get(1)?,
        description: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sample_user, test_db};

    fn other_user(db: &mut Database, email: &str) -> User {
        let user = sample_user(email, UserRole::Other);
        db.create_user(&user, Some(&RoleProfile::Other(OtherProfile::default())))
            .unwrap();
        user
    }

    #[test]
    fn effective_profile_tracks_current_role() {
        let (mut db, _dir) = test_db();
        let user = other_user(&mut db, "p@x.com");

        let faculty = RoleProfile::Faculty(FacultyProfile {
            institution: Some("NLU Delhi".to_string()),
            mentoring: true,
            ..Default::default()
        });
        db.replace_profile(user.id, &faculty).unwrap();

        let (user, profile) = db.get_user_with_profile(user.id).unwrap();
        assert_eq!(user.role, UserRole::Faculty);
        assert_eq!(profile, Some(faculty));

        // The old extension row is gone, not merely shadowed.
        assert!(db.get_profile(user.id, UserRole::Other).unwrap().is_none());
    }

    #[test]
    fn transition_leaves_exactly_one_extension_row() {
        let (mut db, _dir) = test_db();
        let user = other_user(&mut db, "one@x.com");

        db.replace_profile(
            user.id,
            &RoleProfile::Innovator(InnovatorProfile::default()),
        )
        .unwrap();
        db.replace_profile(user.id, &RoleProfile::Faculty(FacultyProfile::default()))
            .unwrap();

        let mut rows = 0;
        for role in [
            UserRole::Innovator,
            UserRole::Mentor,
            UserRole::Faculty,
            UserRole::Other,
        ] {
            if db.get_profile(user.id, role).unwrap().is_some() {
                rows += 1;
            }
        }
        assert_eq!(rows, 1);
    }

    #[test]
    fn mentor_application_lifecycle() {
        let (mut db, _dir) = test_db();
        let user = other_user(&mut db, "apply@x.com");
        let admin = sample_user("admin@x.com", UserRole::Admin);
        db.create_user(&admin, None).unwrap();

        db.apply_mentor(
            user.id,
            &MentorProfile {
                mentor_type: MentorType::LegalExpert,
                organization: Some("Bar Council".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        // Pending: role unchanged, application visible.
        let (u, _) = db.get_user_with_profile(user.id).unwrap();
        assert_eq!(u.role, UserRole::Other);
        let pending = db.list_pending_mentor_applications().unwrap();
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].1.approved);

        db.approve_mentor(user.id, admin.id).unwrap();

        let (u, profile) = db.get_user_with_profile(user.id).unwrap();
        assert_eq!(u.role, UserRole::Mentor);
        match profile {
            Some(RoleProfile::Mentor(m)) => {
                assert!(m.approved);
                assert_eq!(m.reviewed_by, Some(admin.id));
            }
            other => panic!("expected mentor profile, got {other:?}"),
        }
        // The Other row is gone.
        assert!(db.get_profile(user.id, UserRole::Other).unwrap().is_none());

        // Double approval is rejected.
        let err = db.approve_mentor(user.id, admin.id).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyReviewed));
    }

    #[test]
    fn mentor_rejection_restores_other_row() {
        let (mut db, _dir) = test_db();
        let user = other_user(&mut db, "reject@x.com");
        let admin = sample_user("admin2@x.com", UserRole::Admin);
        db.create_user(&admin, None).unwrap();

        db.apply_mentor(
            user.id,
            &MentorProfile {
                mentor_type: MentorType::OdrExpert,
                ..Default::default()
            },
        )
        .unwrap();

        db.reject_mentor(user.id, admin.id, "insufficient experience")
            .unwrap();

        let (u, profile) = db.get_user_with_profile(user.id).unwrap();
        assert_eq!(u.role, UserRole::Other);
        match profile {
            Some(RoleProfile::Other(o)) => {
                assert_eq!(
                    o.role.as_deref(),
                    Some("Rejected mentor applicant (ODR_EXPERT)")
                );
            }
            other => panic!("expected other profile, got {other:?}"),
        }

        // The application record survives with the decision on it.
        let app = db.get_mentor_application(user.id).unwrap().unwrap();
        assert_eq!(app.rejection_reason.as_deref(), Some("insufficient experience"));
        assert!(app.reviewed_at.is_some());

        // Re-application resets the sub-state.
        db.apply_mentor(user.id, &MentorProfile::default()).unwrap();
        let app = db.get_mentor_application(user.id).unwrap().unwrap();
        assert!(app.rejection_reason.is_none());
        assert!(app.reviewed_at.is_none());
    }
}
