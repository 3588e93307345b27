//! Threaded comments on ideas.

use rusqlite::params;
use uuid::Uuid;

use crate::database::{col_timestamp, col_uuid, col_uuid_opt, Database};
use crate::error::{Result, StoreError};
use crate::models::Comment;

const COMMENT_COLS: &str = "id, content, idea_id, author_id, parent_id, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new comment.
    ///
    /// A reply's parent must exist and belong to the same idea; replies that
    /// point across ideas are rejected with [`StoreError::InvalidParent`].
    pub fn create_comment(&self, comment: &Comment) -> Result<()> {
        if let Some(parent_id) = comment.parent_id {
            let parent = self.get_comment(parent_id)?;
            if parent.idea_id != comment.idea_id {
                return Err(StoreError::InvalidParent);
            }
        }

        self.conn().execute(
            "INSERT INTO comments (id, content, idea_id, author_id, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                comment.id.to_string(),
                comment.content,
                comment.idea_id.to_string(),
                comment.author_id.to_string(),
                comment.parent_id.map(|p| p.to_string()),
                comment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single comment by id.
    pub fn get_comment(&self, id: Uuid) -> Result<Comment> {
        self.conn()
            .query_row(
                &format!("SELECT {COMMENT_COLS} FROM comments WHERE id = ?1"),
                params![id.to_string()],
                row_to_comment,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List the full comment thread for an idea, oldest first.  Threading is
    /// reconstructed by the caller from `parent_id`.
    pub fn list_comments_for_idea(&self, idea_id: Uuid) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COMMENT_COLS} FROM comments WHERE idea_id = ?1 ORDER BY created_at ASC"
        ))?;

        let rows = stmt.query_map(params![idea_id.to_string()], row_to_comment)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a comment.  Replies and likes cascade.  Returns `true` if a
    /// row was deleted.
    pub fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM comments WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let id_str: String = row.get(0)?;
    let idea_str: String = row.get(2)?;
    let author_str: String = row.get(3)?;
    let parent_str: Option<String> = row.get(4)?;
    let created_str: String = row.get(5)?;

    Ok(Comment {
        id: col_uuid(0, &id_str)?,
        content: row.get(1)?,
        idea_id: col_uuid(2, &idea_str)?,
        author_id: col_uuid(3, &author_str)?,
        parent_id: col_uuid_opt(4, parent_str)?,
        created_at: col_timestamp(5, &created_str)?,
    })
}
