//! Admin review and user-management endpoints.  Every handler requires the
//! ADMIN role on top of authentication.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Extension, Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use odrlab_store::{Idea, IdeaSubmission, MentorProfile, UserRole};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

use super::{non_empty, write_audit, IdeaResponse, ProfileInput, UserResponse};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SubmissionsQuery {
    /// When true, only submissions awaiting review.
    #[serde(default)]
    pub pending: bool,
}

#[derive(Deserialize)]
pub struct ReviewSubmissionRequest {
    /// Historically sent as `ideaId` by older frontends.
    #[serde(alias = "ideaId")]
    pub submission_id: Uuid,
}

#[derive(Deserialize)]
pub struct RejectSubmissionRequest {
    #[serde(alias = "ideaId")]
    pub submission_id: Uuid,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct MentorDecisionRequest {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct RejectMentorRequest {
    pub user_id: Uuid,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub image_avatar: Option<String>,
    pub role: Option<UserRole>,
    pub profile: Option<ProfileInput>,
}

#[derive(Deserialize)]
pub struct CreateIdeaRequest {
    pub title: String,
    pub caption: Option<String>,
    pub description: String,
    /// Defaults to the acting admin.
    pub owner_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct MentorApplicationResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub application: MentorProfile,
}

// ---------------------------------------------------------------------------
// Submission review
// ---------------------------------------------------------------------------

/// GET /api/admin/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SubmissionsQuery>,
) -> Result<Json<Vec<IdeaSubmission>>, ApiError> {
    auth.require_admin()?;

    let db = state.db.lock().await;
    Ok(Json(db.list_submissions(query.pending)?))
}

/// POST /api/admin/approve-idea
///
/// Approves a submission and publishes the derived idea.  Re-approving an
/// already-reviewed submission fails with a conflict and never duplicates
/// the idea.
pub async fn approve_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<ReviewSubmissionRequest>,
) -> Result<Json<IdeaResponse>, ApiError> {
    auth.require_admin()?;

    let ip = connect_info.map(|c| c.0.ip());
    let mut db = state.db.lock().await;
    let idea = db.approve_submission(req.submission_id, auth.user.id)?;
    write_audit(
        &db,
        "approve_idea",
        Some(&auth.user),
        Some(("idea_submission", req.submission_id.to_string())),
        true,
        None,
        ip,
    );

    tracing::info!(submission = %req.submission_id, idea = %idea.id, "submission approved");

    Ok(Json(IdeaResponse::load(&db, idea)?))
}

/// POST /api/admin/reject-idea
pub async fn reject_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<RejectSubmissionRequest>,
) -> Result<Json<IdeaSubmission>, ApiError> {
    auth.require_admin()?;
    non_empty("reason", &req.reason)?;

    let ip = connect_info.map(|c| c.0.ip());
    let mut db = state.db.lock().await;
    let submission = db.reject_submission(req.submission_id, auth.user.id, &req.reason)?;
    write_audit(
        &db,
        "reject_idea",
        Some(&auth.user),
        Some(("idea_submission", req.submission_id.to_string())),
        true,
        Some(&req.reason),
        ip,
    );

    tracing::info!(submission = %req.submission_id, "submission rejected");

    Ok(Json(submission))
}

// ---------------------------------------------------------------------------
// Mentor review
// ---------------------------------------------------------------------------

/// GET /api/admin/mentor-applications
pub async fn mentor_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<MentorApplicationResponse>>, ApiError> {
    auth.require_admin()?;

    let db = state.db.lock().await;
    let applications = db
        .list_pending_mentor_applications()?
        .into_iter()
        .map(|(user, application)| MentorApplicationResponse {
            user_id: user.id,
            name: user.name,
            email: user.email,
            application,
        })
        .collect();
    Ok(Json(applications))
}

/// POST /api/admin/approve-mentor
pub async fn approve_mentor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<MentorDecisionRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    auth.require_admin()?;

    let ip = connect_info.map(|c| c.0.ip());
    let mut db = state.db.lock().await;
    db.approve_mentor(req.user_id, auth.user.id)?;
    write_audit(
        &db,
        "approve_mentor",
        Some(&auth.user),
        Some(("user", req.user_id.to_string())),
        true,
        None,
        ip,
    );

    tracing::info!(user = %req.user_id, "mentor application approved");

    let (user, profile) = db.get_user_with_profile(req.user_id)?;
    Ok(Json(UserResponse::new(user, profile)))
}

/// POST /api/admin/approve-mentor/reject
pub async fn reject_mentor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<RejectMentorRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    auth.require_admin()?;
    non_empty("reason", &req.reason)?;

    let ip = connect_info.map(|c| c.0.ip());
    let mut db = state.db.lock().await;
    db.reject_mentor(req.user_id, auth.user.id, &req.reason)?;
    write_audit(
        &db,
        "reject_mentor",
        Some(&auth.user),
        Some(("user", req.user_id.to_string())),
        true,
        Some(&req.reason),
        ip,
    );

    tracing::info!(user = %req.user_id, "mentor application rejected");

    let (user, profile) = db.get_user_with_profile(req.user_id)?;
    Ok(Json(UserResponse::new(user, profile)))
}

// ---------------------------------------------------------------------------
// User management
// ---------------------------------------------------------------------------

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    auth.require_admin()?;

    let db = state.db.lock().await;
    let mut out = Vec::new();
    for user in db.list_users()? {
        let profile = db.get_profile(user.id, user.role)?;
        out.push(UserResponse::new(user, profile));
    }
    Ok(Json(out))
}

/// PUT /api/admin/users/:id
///
/// Edits any user, including role transitions; the stale extension row is
/// removed in the same transaction that flips the role.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    auth.require_admin()?;

    let ip = connect_info.map(|c| c.0.ip());
    let mut db = state.db.lock().await;
    let mut user = db.get_user(id)?;

    if let Some(name) = req.name {
        non_empty("name", &name)?;
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
    db.update_user(&user)?;

    match (req.role, req.profile) {
        (Some(UserRole::Admin), _) => {
            db.promote_to_admin(user.id)?;
        }
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

    write_audit(
        &db,
        "admin_update_user",
        Some(&auth.user),
        Some(("user", id.to_string())),
        true,
        None,
        ip,
    );

    let (user, profile) = db.get_user_with_profile(id)?;
    Ok(Json(UserResponse::new(user, profile)))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require_admin()?;

    if id == auth.user.id {
        return Err(ApiError::BadRequest(
            "admins cannot delete their own account".to_string(),
        ));
    }

    let ip = connect_info.map(|c| c.0.ip());
    let mut db = state.db.lock().await;
    let deleted = db.delete_user(id)?;
    if !deleted {
        return Err(ApiError::NotFound("user not found".to_string()));
    }

    write_audit(
        &db,
        "admin_delete_user",
        Some(&auth.user),
        Some(("user", id.to_string())),
        true,
        None,
        ip,
    );

    tracing::info!(user = %id, by = %auth.user.id, "user deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /api/admin/ideas
///
/// Direct idea creation, bypassing the submission queue.
pub async fn create_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<IdeaResponse>), ApiError> {
    auth.require_admin()?;
    non_empty("title", &req.title)?;
    non_empty("description", &req.description)?;

    let db = state.db.lock().await;

    let owner_id = match req.owner_id {
        Some(owner_id) => {
            // Ensure the target owner exists before publishing in their name.
            db.get_user(owner_id)?;
            owner_id
        }
        None => auth.user.id,
    };

    let idea = Idea {
        id: Uuid::new_v4(),
        title: req.title.trim().to_string(),
        caption: req.caption,
        description: req.description,
        owner_id,
        approved: true,
        created_at: Utc::now(),
    };
    db.create_idea(&idea)?;

    tracing::info!(idea = %idea.id, owner = %owner_id, "idea published directly");

    let response = IdeaResponse::load(&db, idea)?;
    Ok((StatusCode::CREATED, Json(response)))
}
