//! Likes on ideas and comments.
//!
//! A like is keyed by (user, idea) XOR (user, comment), unique once each.
//! Liking twice is a no-op thanks to `INSERT OR IGNORE` against the unique
//! index; unliking something never liked is a no-op too.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;

impl Database {
    // ------------------------------------------------------------------
    // Ideas
    // ------------------------------------------------------------------

    /// Like an idea.  Idempotent; returns `true` if a new row was created.
    pub fn like_idea(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO likes (id, user_id, idea_id, comment_id, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![
                Uuid::new_v4().to_string(),
                user_id.to_string(),
                idea_id.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Remove a like from an idea.  Returns `true` if a row was deleted.
    pub fn unlike_idea(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM likes WHERE user_id = ?1 AND idea_id = ?2",
            params![user_id.to_string(), idea_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Whether the user currently likes the idea.
    pub fn has_liked_idea(&self, user_id: Uuid, idea_id: Uuid) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM likes WHERE user_id = ?1 AND idea_id = ?2",
            params![user_id.to_string(), idea_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Total likes on an idea.
    pub fn count_idea_likes(&self, idea_id: Uuid) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM likes WHERE idea_id = ?1",
            params![idea_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Like a comment.  Idempotent; returns `true` if a new row was created.
    pub fn like_comment(&self, user_id: Uuid, comment_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO likes (id, user_id, idea_id, comment_id, created_at)
             VALUES (?1, ?2, NULL, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                user_id.to_string(),
                comment_id.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Remove a like from a comment.  Returns `true` if a row was deleted.
    pub fn unlike_comment(&self, user_id: Uuid, comment_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM likes WHERE user_id = ?1 AND comment_id = ?2",
            params![user_id.to_string(), comment_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Total likes on a comment.
    pub fn count_comment_likes(&self, comment_id: Uuid) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM likes WHERE comment_id = ?1",
            params![comment_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, Idea, OtherProfile, RoleProfile, UserRole};
    use crate::testutil::{sample_user, test_db};

    fn setup(db: &mut Database) -> (Uuid, Uuid, Uuid) {
        let user = sample_user("liker@x.com", UserRole::Other);
        db.create_user(&user, Some(&RoleProfile::Other(OtherProfile::default())))
            .unwrap();

        let idea = Idea {
            id: Uuid::new_v4(),
            title: "Dispute timeline viewer".to_string(),
            caption: None,
            description: "Visual timeline of a dispute's lifecycle.".to_string(),
            owner_id: user.id,
            approved: true,
            created_at: Utc::now(),
        };
        db.create_idea(&idea).unwrap();

        let comment = Comment {
            id: Uuid::new_v4(),
            content: "Nice".to_string(),
            idea_id: idea.id,
            author_id: user.id,
            parent_id: None,
            created_at: Utc::now(),
        };
        db.create_comment(&comment).unwrap();

        (user.id, idea.id, comment.id)
    }

    #[test]
    fn idea_like_is_idempotent() {
        let (mut db, _dir) = test_db();
        let (user_id, idea_id, _) = setup(&mut db);

        assert!(db.like_idea(user_id, idea_id).unwrap());
        // Second like creates no new row.
        assert!(!db.like_idea(user_id, idea_id).unwrap());
        assert_eq!(db.count_idea_likes(idea_id).unwrap(), 1);
        assert!(db.has_liked_idea(user_id, idea_id).unwrap());

        assert!(db.unlike_idea(user_id, idea_id).unwrap());
        // Unlike with no like present is a no-op.
        assert!(!db.unlike_idea(user_id, idea_id).unwrap());
        assert_eq!(db.count_idea_likes(idea_id).unwrap(), 0);
    }

    #[test]
    fn comment_and_idea_likes_are_independent() {
        let (mut db, _dir) = test_db();
        let (user_id, idea_id, comment_id) = setup(&mut db);

        assert!(db.like_idea(user_id, idea_id).unwrap());
        assert!(db.like_comment(user_id, comment_id).unwrap());
        assert!(!db.like_comment(user_id, comment_id).unwrap());

        assert_eq!(db.count_idea_likes(idea_id).unwrap(), 1);
        assert_eq!(db.count_comment_likes(comment_id).unwrap(), 1);

        assert!(db.unlike_comment(user_id, comment_id).unwrap());
        assert!(db.has_liked_idea(user_id, idea_id).unwrap());
    }
}
