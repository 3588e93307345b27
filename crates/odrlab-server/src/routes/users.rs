//! Self-service profile endpoints.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Extension, Json, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use odrlab_store::{MentorProfile, MentorType, UserRole};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

use super::{write_audit, ProfileInput, UserResponse};

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub image_avatar: Option<String>,
    /// Optional role switch; the old extension row is replaced atomically.
    pub role: Option<UserRole>,
    pub profile: Option<ProfileInput>,
}

#[derive(Deserialize)]
pub struct ApplyMentorRequest {
    pub mentor_type: Option<MentorType>,
    pub organization: Option<String>,
    pub role: Option<String>,
    pub expertise: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct ApplyMentorResponse {
    pub pending: bool,
}

/// GET /api/user/profile
pub async fn get_profile(Extension(auth): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse::new(auth.user, auth.profile))
}

/// PUT /api/user/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut user = auth.user;

    if let Some(name) = req.name {
        super::non_empty("name", &name)?;
        user.name = name.trim().to_string();
    }
    if let Some(contact) = req.contact_number {
        user.contact_number = Some(contact);
    }
    if let Some(city) = req.city {
        user.city = Some(city);
    }
    if let Some(country) = req.country {
        user.country = Some(country);
    }
    if let Some(avatar) = req.image_avatar {
        user.image_avatar = Some(avatar);
    }
    user.updated_at = Utc::now();

    // Admins carry no extension row; their role is fixed on this endpoint.
    if user.role.is_admin() && (req.role.is_some() || req.profile.is_some()) {
        return Err(ApiError::Forbidden(
            "admin role and profile cannot be changed here".to_string(),
        ));
    }
    if req.role == Some(UserRole::Admin) {
        return Err(ApiError::Validation {
            field: "role",
            message: "cannot switch to admin".to_string(),
        });
    }

    let mut db = state.db.lock().await;
    db.update_user(&user)?;

    match (req.role, req.profile) {
        (Some(role), profile) => {
            if let Some(profile) = profile.unwrap_or_default().into_profile(role) {
                db.replace_profile(user.id, &profile)?;
            }
        }
        (None, Some(profile)) => {
            if let Some(profile) = profile.into_profile(user.role) {
                db.replace_profile(user.id, &profile)?;
            }
        }
        (None, None) => {}
    }

    let (user, profile) = db.get_user_with_profile(user.id)?;
    Ok(Json(UserResponse::new(user, profile)))
}

/// POST /api/user/apply-mentor
pub async fn apply_mentor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<ApplyMentorRequest>,
) -> Result<(StatusCode, Json<ApplyMentorResponse>), ApiError> {
    if auth.user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "admins cannot apply for mentorship".to_string(),
        ));
    }
    if auth.user.role == UserRole::Mentor {
        return Err(ApiError::BadRequest("already a mentor".to_string()));
    }

    let application = MentorProfile {
        mentor_type: req.mentor_type.unwrap_or_default(),
        organization: req.organization,
        role: req.role,
        expertise: req.expertise,
        description: req.description,
        approved: false,
        rejection_reason: None,
        reviewed_at: None,
        reviewed_by: None,
    };

    let ip = connect_info.map(|c| c.0.ip());
    let db = state.db.lock().await;
    db.apply_mentor(auth.user.id, &application)?;
    write_audit(
        &db,
        "apply_mentor",
        Some(&auth.user),
        None,
        true,
        Some(application.mentor_type.as_str()),
        ip,
    );

    tracing::info!(user = %auth.user.id, mentor_type = application.mentor_type.as_str(), "mentor application filed");

    Ok((StatusCode::CREATED, Json(ApplyMentorResponse { pending: true })))
}
