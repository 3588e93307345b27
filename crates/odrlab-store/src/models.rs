//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the HTTP
//! layer for response shaping.  Role-specific data is modeled as the
//! [`RoleProfile`] tagged union so that every role is handled exhaustively at
//! compile time instead of by string-keyed branching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Top-level user role discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Innovator,
    Mentor,
    Faculty,
    Other,
}

impl UserRole {
    /// The TEXT value stored in the `users.role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Innovator => "INNOVATOR",
            UserRole::Mentor => "MENTOR",
            UserRole::Faculty => "FACULTY",
            UserRole::Other => "OTHER",
        }
    }

    /// Parse a stored role discriminator.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(UserRole::Admin),
            "INNOVATOR" => Some(UserRole::Innovator),
            "MENTOR" => Some(UserRole::Mentor),
            "FACULTY" => Some(UserRole::Faculty),
            "OTHER" => Some(UserRole::Other),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mentor specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentorType {
    #[default]
    TechnicalExpert,
    LegalExpert,
    OdrExpert,
    ConflictResolutionExpert,
}

impl MentorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorType::TechnicalExpert => "TECHNICAL_EXPERT",
            MentorType::LegalExpert => "LEGAL_EXPERT",
            MentorType::OdrExpert => "ODR_EXPERT",
            MentorType::ConflictResolutionExpert => "CONFLICT_RESOLUTION_EXPERT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TECHNICAL_EXPERT" => Some(MentorType::TechnicalExpert),
            "LEGAL_EXPERT" => Some(MentorType::LegalExpert),
            "ODR_EXPERT" => Some(MentorType::OdrExpert),
            "CONFLICT_RESOLUTION_EXPERT" => Some(MentorType::ConflictResolutionExpert),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// User (base identity)
// ---------------------------------------------------------------------------

/// Base user record.  Role-specific fields live in the extension tables and
/// are surfaced through [`RoleProfile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Stored lower-cased and trimmed; unique.
    pub email: String,
    /// Argon2 hash.  `None` for Google-only accounts.  Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub contact_number: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub image_avatar: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Role extensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InnovatorProfile {
    pub institution: Option<String>,
    pub highest_education: Option<String>,
    pub course_name: Option<String>,
    pub course_status: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MentorProfile {
    pub mentor_type: MentorType,
    pub organization: Option<String>,
    /// Free-text position label ("Professor of Law", ...).
    pub role: Option<String>,
    pub expertise: Option<String>,
    pub description: Option<String>,
    /// Mentor application sub-state, independent of the user's top-level role.
    pub approved: bool,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FacultyProfile {
    pub institution: Option<String>,
    pub role: Option<String>,
    pub expertise: Option<String>,
    pub course: Option<String>,
    pub mentoring: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OtherProfile {
    pub role: Option<String>,
    pub workplace: Option<String>,
    pub description: Option<String>,
}

/// Tagged union over the four role-extension shapes.
///
/// Every role change goes through this type, so the mapping from role to
/// extension table is a single exhaustive `match` rather than per-endpoint
/// string comparisons.  Serialized untagged: the discriminator already lives
/// on the user record.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RoleProfile {
    Innovator(InnovatorProfile),
    Mentor(MentorProfile),
    Faculty(FacultyProfile),
    Other(OtherProfile),
}

impl RoleProfile {
    /// The role whose extension table this profile belongs to.
    pub fn role(&self) -> UserRole {
        match self {
            RoleProfile::Innovator(_) => UserRole::Innovator,
            RoleProfile::Mentor(_) => UserRole::Mentor,
            RoleProfile::Faculty(_) => UserRole::Faculty,
            RoleProfile::Other(_) => UserRole::Other,
        }
    }

    /// An empty profile for the given role, or `None` for `ADMIN` (admins
    /// carry no extension row).
    pub fn empty(role: UserRole) -> Option<Self> {
        match role {
            UserRole::Admin => None,
            UserRole::Innovator => Some(RoleProfile::Innovator(InnovatorProfile::default())),
            UserRole::Mentor => Some(RoleProfile::Mentor(MentorProfile::default())),
            UserRole::Faculty => Some(RoleProfile::Faculty(FacultyProfile::default())),
            UserRole::Other => Some(RoleProfile::Other(OtherProfile::default())),
        }
    }
}

// ---------------------------------------------------------------------------
// Idea workflow
// ---------------------------------------------------------------------------

/// A user-authored idea draft awaiting admin review.
///
/// Terminal once reviewed: either `approved` (an [`Idea`] was created from it)
/// or `rejected`.  Re-submission after rejection is a brand-new row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdeaSubmission {
    pub id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub description: String,
    pub prior_odr_experience: Option<String>,
    pub owner_id: Uuid,
    pub reviewed: bool,
    pub approved: bool,
    pub rejected: bool,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A published idea.  Created by submission approval or directly by an admin;
/// `approved` is true at creation in both paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub description: String,
    pub owner_id: Uuid,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Collaboration
// ---------------------------------------------------------------------------

/// A membership row on an idea, joined with the member's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdeaMember {
    pub user_id: Uuid,
    pub idea_id: Uuid,
    pub name: String,
    /// Optional label ("frontend", "legal advisor", ...).
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A threaded comment on an idea.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub idea_id: Uuid,
    pub author_id: Uuid,
    /// Reply target; must reference a comment on the same idea.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

/// One append-only audit record.  Written on auth events and admin mutations,
/// never read back by the application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub user_role: Option<String>,
    pub target_id: Option<String>,
    pub target_type: Option<String>,
    pub success: bool,
    pub message: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in [
            UserRole::Admin,
            UserRole::Innovator,
            UserRole::Mentor,
            UserRole::Faculty,
            UserRole::Other,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("SUPERUSER"), None);
    }

    #[test]
    fn mentor_type_defaults_to_technical() {
        assert_eq!(MentorType::default(), MentorType::TechnicalExpert);
        assert_eq!(
            MentorType::parse("CONFLICT_RESOLUTION_EXPERT"),
            Some(MentorType::ConflictResolutionExpert)
        );
    }

    #[test]
    fn empty_profile_matches_role() {
        assert!(RoleProfile::empty(UserRole::Admin).is_none());
        for role in [
            UserRole::Innovator,
            UserRole::Mentor,
            UserRole::Faculty,
            UserRole::Other,
        ] {
            assert_eq!(RoleProfile::empty(role).unwrap().role(), role);
        }
    }
}
