//! Append-only audit trail.
//!
//! Entries are written on auth events and admin mutations and never read
//! back by the application; the table exists for external inspection.

use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::AuditEntry;

impl Database {
    /// Append one audit record.
    pub fn record_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO audit_log
                 (id, action, user_id, user_role, target_id, target_type, success, message,
                  ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id.to_string(),
                entry.action,
                entry.user_id.map(|u| u.to_string()),
                entry.user_role,
                entry.target_id,
                entry.target_type,
                entry.success,
                entry.message,
                entry.ip_address,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
