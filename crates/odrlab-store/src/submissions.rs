//! CRUD and review transitions for [`IdeaSubmission`] records.
//!
//! A submission is terminal once reviewed.  Both review paths re-check the
//! `reviewed` flag inside their transaction, so a double approval can never
//! create a second [`Idea`].

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::database::{col_timestamp, col_timestamp_opt, col_uuid, col_uuid_opt, Database};
use crate::error::{Result, StoreError};
use crate::models::{Idea, IdeaSubmission};

const SUBMISSION_COLS: &str =
    "id, title, caption, description, prior_odr_experience, owner_id, reviewed, approved, \
     rejected, rejection_reason, reviewed_at, reviewed_by, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new submission in the un-reviewed state.
    pub fn create_submission(&self, submission: &IdeaSubmission) -> Result<()> {
        self.conn().execute(
            "INSERT INTO idea_submissions
                 (id, title, caption, description, prior_odr_experience, owner_id,
                  reviewed, approved, rejected, rejection_reason, reviewed_at, reviewed_by,
                  created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, 0, NULL, NULL, NULL, ?7)",
            params![
                submission.id.to_string(),
                submission.title,
                submission.caption,
                submission.description,
                submission.prior_odr_experience,
                submission.owner_id.to_string(),
                submission.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single submission by id.
    pub fn get_submission(&self, id: Uuid) -> Result<IdeaSubmission> {
        get_submission_row(self.conn(), id)
    }

    /// List submissions, newest first.  With `pending_only`, only those not
    /// yet reviewed.
    pub fn list_submissions(&self, pending_only: bool) -> Result<Vec<IdeaSubmission>> {
        let sql = if pending_only {
            format!(
                "SELECT {SUBMISSION_COLS} FROM idea_submissions
                 WHERE reviewed = 0 ORDER BY created_at DESC"
            )
        } else {
            format!("SELECT {SUBMISSION_COLS} FROM idea_submissions ORDER BY created_at DESC")
        };

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_submission)?;

        let mut submissions = Vec::new();
        for row in rows {
            submissions.push(row?);
        }
        Ok(submissions)
    }

    /// List a user's own submissions, newest first.
    pub fn list_submissions_for_owner(&self, owner_id: Uuid) -> Result<Vec<IdeaSubmission>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SUBMISSION_COLS} FROM idea_submissions
             WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id.to_string()], row_to_submission)?;

        let mut submissions = Vec::new();
        for row in rows {
            submissions.push(row?);
        }
        Ok(submissions)
    }

    // ------------------------------------------------------------------
    // Review transitions
    // ------------------------------------------------------------------

    /// Approve a submission, creating the published [`Idea`] in the same
    /// transaction.
    ///
    /// Copies exactly title, caption, description and owner onto the new
    /// idea; review metadata intentionally stays behind on the submission.
    /// Fails with [`StoreError::AlreadyReviewed`] if the submission has
    /// already been decided.
    pub fn approve_submission(&mut self, submission_id: Uuid, reviewer: Uuid) -> Result<Idea> {
        let tx = self.conn_mut().transaction()?;

        let submission = get_submission_row(&tx, submission_id)?;
        if submission.reviewed {
            return Err(StoreError::AlreadyReviewed);
        }

        let now = Utc::now();
        tx.execute(
            "UPDATE idea_submissions
             SET reviewed = 1, approved = 1, reviewed_at = ?1, reviewed_by = ?2
             WHERE id = ?3",
            params![
                now.to_rfc3339(),
                reviewer.to_string(),
                submission_id.to_string(),
            ],
        )?;

        let idea = Idea {
            id: Uuid::new_v4(),
            title: submission.title,
            caption: submission.caption,
            description: submission.description,
            owner_id: submission.owner_id,
            approved: true,
            created_at: now,
        };

        tx.execute(
            "INSERT INTO ideas (id, title, caption, description, owner_id, approved, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                idea.id.to_string(),
                idea.title,
                idea.caption,
                idea.description,
                idea.owner_id.to_string(),
                idea.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(idea)
    }

    /// Reject a submission with a reason.  Terminal, same guard as approval.
    pub fn reject_submission(
        &mut self,
        submission_id: Uuid,
        reviewer: Uuid,
        reason: &str,
    ) -> Result<IdeaSubmission> {
        let tx = self.conn_mut().transaction()?;

        let submission = get_submission_row(&tx, submission_id)?;
        if submission.reviewed {
            return Err(StoreError::AlreadyReviewed);
        }

        tx.execute(
            "UPDATE idea_submissions
             SET reviewed = 1, rejected = 1, rejection_reason = ?1,
                 reviewed_at = ?2, reviewed_by = ?3
             WHERE id = ?4",
            params![
                reason,
                Utc::now().to_rfc3339(),
                reviewer.to_string(),
                submission_id.to_string(),
            ],
        )?;

        tx.commit()?;
        get_submission_row(self.conn(), submission_id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn get_submission_row(conn: &Connection, id: Uuid) -> Result<IdeaSubmission> {
    conn.query_row(
        &format!("SELECT {SUBMISSION_COLS} FROM idea_submissions WHERE id = ?1"),
        params![id.to_string()],
        row_to_submission,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

fn row_to_submission(row: &rusqlite::Row<'_>) -> rusqlite::Result<IdeaSubmission> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(5)?;
    let reviewed_at: Option<String> = row.get(10)?;
    let reviewed_by: Option<String> = row.get(11)?;
    let created_str: String = row.get(12)?;

    Ok(IdeaSubmission {
        id: col_uuid(0, &id_str)?,
        title: row.get(1)?,
        caption: row.get(2)?,
        description: row.get(3)?,
        prior_odr_experience: row.get(4)?,
        owner_id: col_uuid(5, &owner_str)?,
        reviewed: row.get(6)?,
        approved: row.get(7)?,
        rejected: row.get(8)?,
        rejection_reason: row.get(9)?,
        reviewed_at: col_timestamp_opt(10, reviewed_at)?,
        reviewed_by: col_uuid_opt(11, reviewed_by)?,
        created_at: col_timestamp(12, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OtherProfile, RoleProfile, UserRole};
    use crate::testutil::{sample_user, test_db};

    fn sample_submission(owner_id: Uuid) -> IdeaSubmission {
        IdeaSubmission {
            id: Uuid::new_v4(),
            title: "Mediation triage bot".to_string(),
            caption: Some("Route disputes to the right track".to_string()),
            description: "A triage flow for incoming disputes.".to_string(),
            prior_odr_experience: None,
            owner_id,
            reviewed: false,
            approved: false,
            rejected: false,
            rejection_reason: None,
            reviewed_at: None,
            reviewed_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn approval_creates_idea_and_is_terminal() {
        let (mut db, _dir) = test_db();
        let owner = sample_user("owner@x.com", UserRole::Other);
        db.create_user(&owner, Some(&RoleProfile::Other(OtherProfile::default())))
            .unwrap();
        let admin = sample_user("admin@x.com", UserRole::Admin);
        db.create_user(&admin, None).unwrap();

        let submission = sample_submission(owner.id);
        db.create_submission(&submission).unwrap();

        let idea = db.approve_submission(submission.id, admin.id).unwrap();
        assert_eq!(idea.title, submission.title);
        assert_eq!(idea.owner_id, owner.id);
        assert!(idea.approved);

        let stored = db.get_submission(submission.id).unwrap();
        assert!(stored.reviewed && stored.approved && !stored.rejected);
        assert_eq!(stored.reviewed_by, Some(admin.id));

        // Double approval must fail without creating a second idea.
        let err = db.approve_submission(submission.id, admin.id).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyReviewed));
        assert_eq!(db.list_approved_ideas().unwrap().len(), 1);
    }

    #[test]
    fn rejection_is_terminal_too() {
        let (mut db, _dir) = test_db();
        let owner = sample_user("owner2@x.com", UserRole::Other);
        db.create_user(&owner, Some(&RoleProfile::Other(OtherProfile::default())))
            .unwrap();
        let admin = sample_user("admin2@x.com", UserRole::Admin);
        db.create_user(&admin, None).unwrap();

        let submission = sample_submission(owner.id);
        db.create_submission(&submission).unwrap();

        let rejected = db
            .reject_submission(submission.id, admin.id, "out of scope")
            .unwrap();
        assert!(rejected.reviewed && rejected.rejected && !rejected.approved);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("out of scope"));

        let err = db.approve_submission(submission.id, admin.id).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyReviewed));
        assert!(db.list_approved_ideas().unwrap().is_empty());
    }

    #[test]
    fn pending_filter_excludes_reviewed() {
        let (mut db, _dir) = test_db();
        let owner = sample_user("owner3@x.com", UserRole::Other);
        db.create_user(&owner, Some(&RoleProfile::Other(OtherProfile::default())))
            .unwrap();
        let admin = sample_user("admin3@x.com", UserRole::Admin);
        db.create_user(&admin, None).unwrap();

        let first = sample_submission(owner.id);
        let second = sample_submission(owner.id);
        db.create_submission(&first).unwrap();
        db.create_submission(&second).unwrap();

        db.reject_submission(first.id, admin.id, "duplicate").unwrap();

        let pending = db.list_submissions(true).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        assert_eq!(db.list_submissions(false).unwrap().len(), 2);
        assert_eq!(db.list_submissions_for_owner(owner.id).unwrap().len(), 2);
    }
}
