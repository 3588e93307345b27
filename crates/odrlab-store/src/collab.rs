//! Collaborator and mentor membership rows on ideas.
//!
//! Both tables have the same shape; the operations differ only in which
//! table they touch and the label used in duplicate errors.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{col_timestamp, col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::IdeaMember;

#[derive(Debug, Clone, Copy)]
enum MemberTable {
    Collaborators,
    Mentors,
}

impl MemberTable {
    fn table(self) -> &'static str {
        match self {
            MemberTable::Collaborators => "idea_collaborators",
            MemberTable::Mentors => "idea_mentors",
        }
    }

    fn label(self) -> &'static str {
        match self {
            MemberTable::Collaborators => "collaborator",
            MemberTable::Mentors => "mentor",
        }
    }
}

impl Database {
    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    /// Add a collaborator to an idea.  Joining twice is rejected.
    pub fn add_collaborator(
        &self,
        user_id: Uuid,
        idea_id: Uuid,
        role: Option<&str>,
    ) -> Result<()> {
        self.add_member(MemberTable::Collaborators, user_id, idea_id, role)
    }

    /// Remove a collaborator.  Returns `true` if a row was deleted.
    pub fn remove_collaborator(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        self.remove_member(MemberTable::Collaborators, user_id, idea_id)
    }

    pub fn is_collaborator(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        self.is_member(MemberTable::Collaborators, user_id, idea_id)
    }

    /// List an idea's collaborators with display names, oldest join first.
    pub fn list_collaborators(&self, idea_id: Uuid) -> Result<Vec<IdeaMember>> {
        self.list_members(MemberTable::Collaborators, idea_id)
    }

    // ------------------------------------------------------------------
    // Mentors
    // ------------------------------------------------------------------

    /// Add a mentor to an idea.  Joining twice is rejected.
    pub fn add_idea_mentor(&self, user_id: Uuid, idea_id: Uuid, role: Option<&str>) -> Result<()> {
        self.add_member(MemberTable::Mentors, user_id, idea_id, role)
    }

    /// Remove a mentor.  Returns `true` if a row was deleted.
    pub fn remove_idea_mentor(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        self.remove_member(MemberTable::Mentors, user_id, idea_id)
    }

    pub fn is_idea_mentor(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        self.is_member(MemberTable::Mentors, user_id, idea_id)
    }

    /// List an idea's mentors with display names, oldest join first.
    pub fn list_idea_mentors(&self, idea_id: Uuid) -> Result<Vec<IdeaMember>> {
        self.list_members(MemberTable::Mentors, idea_id)
    }

    // ------------------------------------------------------------------
    // Shared implementation
    // ------------------------------------------------------------------

    fn add_member(
        &self,
        which: MemberTable,
        user_id: Uuid,
        idea_id: Uuid,
        role: Option<&str>,
    ) -> Result<()> {
        if self.is_member(which, user_id, idea_id)? {
            return Err(StoreError::AlreadyMember(which.label()));
        }

        self.conn().execute(
            &format!(
                "INSERT INTO {} (user_id, idea_id, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                which.table()
            ),
            params![
                user_id.to_string(),
                idea_id.to_string(),
                role,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn remove_member(&self, which: MemberTable, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND idea_id = ?2",
                which.table()
            ),
            params![user_id.to_string(), idea_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    fn is_member(&self, which: MemberTable, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND idea_id = ?2",
                which.table()
            ),
            params![user_id.to_string(), idea_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_members(&self, which: MemberTable, idea_id: Uuid) -> Result<Vec<IdeaMember>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT m.user_id, m.idea_id, u.name, m.role, m.created_at
             FROM {} m
             JOIN users u ON u.id = m.user_id
             WHERE m.idea_id = ?1
             ORDER BY m.created_at ASC",
            which.table()
        ))?;

        let rows = stmt.query_map(params![idea_id.to_string()], row_to_member)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<IdeaMember> {
    let user_str: String = row.get(0)?;
    let idea_str: String = row.get(1)?;
    let created_str: String = row.get(4)?;

    Ok(IdeaMember {
        user_id: col_uuid(0, &user_str)?,
        idea_id: col_uuid(1, &idea_str)?,
        name: row.get(2)?,
        role: row.get(3)?,
        created_at: col_timestamp(4, &created_str)?,
    })
}
