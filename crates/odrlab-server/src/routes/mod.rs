//! Route handlers, one sub-module per API domain.
//!
//! Shared request/response shaping lives here: the sanitized user view, the
//! role-profile field bag accepted by signup and profile updates, and the
//! audit-trail helper.

pub mod admin;
pub mod auth;
pub mod collaboration;
pub mod discussion;
pub mod ideas;
pub mod users;

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use odrlab_store::{
    AuditEntry, Database, FacultyProfile, Idea, InnovatorProfile, MentorProfile, MentorType,
    OtherProfile, RoleProfile, User, UserRole,
};

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// The effective profile of a user as returned to clients: base fields plus
/// the extension matching the current role.  Never contains the password
/// hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub image_avatar: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<RoleProfile>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: User, profile: Option<RoleProfile>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            contact_number: user.contact_number,
            city: user.city,
            country: user.country,
            image_avatar: user.image_avatar,
            role: user.role,
            profile,
            created_at: user.created_at,
        }
    }
}

/// An idea with its like count.
#[derive(Debug, Serialize)]
pub struct IdeaResponse {
    #[serde(flatten)]
    pub idea: Idea,
    pub likes: i64,
}

impl IdeaResponse {
    pub fn load(db: &Database, idea: Idea) -> Result<Self, ApiError> {
        let likes = db.count_idea_likes(idea.id)?;
        Ok(Self { idea, likes })
    }
}

// ---------------------------------------------------------------------------
// Profile field bag
// ---------------------------------------------------------------------------

/// The union of all role-extension fields accepted from clients.  Which
/// subset is read depends on the target role; the rest is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    // Innovator
    pub institution: Option<String>,
    pub highest_education: Option<String>,
    pub course_name: Option<String>,
    pub course_status: Option<String>,
    // Mentor
    pub mentor_type: Option<MentorType>,
    pub organization: Option<String>,
    /// Free-text position label (mentor, faculty, other).
    pub role: Option<String>,
    pub expertise: Option<String>,
    // Faculty
    pub course: Option<String>,
    pub mentoring: Option<bool>,
    // Other
    pub workplace: Option<String>,
    // Shared
    pub description: Option<String>,
}

impl ProfileInput {
    /// Build the extension record for `role`.  Returns `None` only for
    /// ADMIN, which carries no extension row.
    pub fn into_profile(self, role: UserRole) -> Option<RoleProfile> {
        match role {
            UserRole::Admin => None,
            UserRole::Innovator => Some(RoleProfile::Innovator(InnovatorProfile {
                institution: self.institution,
                highest_education: self.highest_education,
                course_name: self.course_name,
                course_status: self.course_status,
                description: self.description,
            })),
            UserRole::Mentor => Some(RoleProfile::Mentor(MentorProfile {
                mentor_type: self.mentor_type.unwrap_or_default(),
                organization: self.organization,
                role: self.role,
                expertise: self.expertise,
                description: self.description,
                approved: false,
                rejection_reason: None,
                reviewed_at: None,
                reviewed_by: None,
            })),
            UserRole::Faculty => Some(RoleProfile::Faculty(FacultyProfile {
                institution: self.institution,
                role: self.role,
                expertise: self.expertise,
                course: self.course,
                mentoring: self.mentoring.unwrap_or(false),
                description: self.description,
            })),
            UserRole::Other => Some(RoleProfile::Other(OtherProfile {
                role: self.role,
                workplace: self.workplace,
                description: self.description,
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn non_empty(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn valid_email(field: &'static str, value: &str) -> Result<(), ApiError> {
    non_empty(field, value)?;
    if !value.contains('@') {
        return Err(ApiError::Validation {
            field,
            message: "must be a valid email address".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn valid_password(field: &'static str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() < 8 {
        return Err(ApiError::Validation {
            field,
            message: "must be at least 8 characters".to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Audit helper
// ---------------------------------------------------------------------------

/// Append an audit record; failures are logged, never surfaced to callers.
pub(crate) fn write_audit(
    db: &Database,
    action: &str,
    user: Option<&User>,
    target: Option<(&str, String)>,
    success: bool,
    message: Option<&str>,
    ip: Option<IpAddr>,
) {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        action: action.to_string(),
        user_id: user.map(|u| u.id),
        user_role: user.map(|u| u.role.as_str().to_string()),
        target_id: target.as_ref().map(|(_, id)| id.clone()),
        target_type: target.as_ref().map(|(kind, _)| kind.to_string()),
        success,
        message: message.map(str::to_string),
        ip_address: ip.map(|i| i.to_string()),
        created_at: Utc::now(),
    };

    if let Err(e) = db.record_audit(&entry) {
        tracing::warn!(error = %e, action, "failed to write audit entry");
    }
}
