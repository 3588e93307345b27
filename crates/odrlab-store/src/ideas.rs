//! CRUD operations for published [`Idea`] records.

use rusqlite::params;
use uuid::Uuid;

use crate::database::{col_timestamp, col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::Idea;

const IDEA_COLS: &str = "id, title, caption, description, owner_id, approved, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new idea.  Both creation paths (submission approval, direct
    /// admin creation) publish with `approved = true`.
    pub fn create_idea(&self, idea: &Idea) -> Result<()> {
        self.conn().execute(
            "INSERT INTO ideas (id, title, caption, description, owner_id, approved, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                idea.id.to_string(),
                idea.title,
                idea.caption,
                idea.description,
                idea.owner_id.to_string(),
                idea.approved,
                idea.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single idea by id.
    pub fn get_idea(&self, id: Uuid) -> Result<Idea> {
        self.conn()
            .query_row(
                &format!("SELECT {IDEA_COLS} FROM ideas WHERE id = ?1"),
                params![id.to_string()],
                row_to_idea,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all approved ideas, newest first.
    pub fn list_approved_ideas(&self) -> Result<Vec<Idea>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {IDEA_COLS} FROM ideas WHERE approved = 1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], row_to_idea)?;

        let mut ideas = Vec::new();
        for row in rows {
            ideas.push(row?);
        }
        Ok(ideas)
    }

    /// List ideas owned by a user, newest first.
    pub fn list_ideas_for_owner(&self, owner_id: Uuid) -> Result<Vec<Idea>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {IDEA_COLS} FROM ideas WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![owner_id.to_string()], row_to_idea)?;

        let mut ideas = Vec::new();
        for row in rows {
            ideas.push(row?);
        }
        Ok(ideas)
    }

    // ------------------------------------------------------------------
    // Update / delete
    // ------------------------------------------------------------------

    /// Update the editable content fields of an idea.
    pub fn update_idea(&self, idea: &Idea) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE ideas SET title = ?1, caption = ?2, description = ?3 WHERE id = ?4",
            params![idea.title, idea.caption, idea.description, idea.id.to_string()],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete an idea.  Comments, likes and membership rows cascade.
    /// Returns `true` if a row was deleted.
    pub fn delete_idea(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM ideas WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` (in `IDEA_COLS` order) to an [`Idea`].
fn row_to_idea(row: &rusqlite::Row<'_>) -> rusqlite::Result<Idea> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(4)?;
    let created_str: String = row.get(6)?;

    Ok(Idea {
        id: col_uuid(0, &id_str)?,
        title: row.get(1)?,
        caption: row.get(2)?,
        description: row.get(3)?,
        owner_id: col_uuid(4, &owner_str)?,
        approved: row.get(5)?,
        created_at: col_timestamp(6, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OtherProfile, RoleProfile, UserRole};
    use crate::testutil::{sample_user, test_db};
    use chrono::Utc;

    fn setup_idea(db: &mut Database) -> Idea {
        let owner = sample_user("idea-owner@x.com", UserRole::Other);
        db.create_user(&owner, Some(&RoleProfile::Other(OtherProfile::default())))
            .unwrap();

        let idea = Idea {
            id: Uuid::new_v4(),
            title: "Smart settlement calculator".to_string(),
            caption: None,
            description: "Estimate settlement ranges from case facts.".to_string(),
            owner_id: owner.id,
            approved: true,
            created_at: Utc::now(),
        };
        db.create_idea(&idea).unwrap();
        idea
    }

    #[test]
    fn create_update_delete_round_trip() {
        let (mut db, _dir) = test_db();
        let mut idea = setup_idea(&mut db);

        idea.title = "Settlement range estimator".to_string();
        db.update_idea(&idea).unwrap();

        let fetched = db.get_idea(idea.id).unwrap();
        assert_eq!(fetched.title, "Settlement range estimator");
        assert_eq!(db.list_approved_ideas().unwrap().len(), 1);
        assert_eq!(db.list_ideas_for_owner(idea.owner_id).unwrap().len(), 1);

        assert!(db.delete_idea(idea.id).unwrap());
        assert!(matches!(db.get_idea(idea.id), Err(StoreError::NotFound)));
        assert!(!db.delete_idea(idea.id).unwrap());
    }

    #[test]
    fn update_missing_idea_is_not_found() {
        let (mut db, _dir) = test_db();
        let idea = setup_idea(&mut db);
        db.delete_idea(idea.id).unwrap();

        assert!(matches!(db.update_idea(&idea), Err(StoreError::NotFound)));
    }
}
