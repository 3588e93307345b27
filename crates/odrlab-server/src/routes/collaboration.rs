//! Collaborator and mentor membership endpoints.

use axum::extract::{Extension, Json, Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use odrlab_store::{Idea, IdeaMember, UserRole};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct JoinRequest {
    /// Optional label describing the contribution ("frontend", ...).
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct MembersResponse {
    pub collaborators: Vec<IdeaMember>,
    pub mentors: Vec<IdeaMember>,
}

fn require_open(idea: &Idea) -> Result<(), ApiError> {
    if !idea.approved {
        return Err(ApiError::BadRequest(
            "collaboration is only open on approved ideas".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/collaboration/:idea_id/join-collaborator
pub async fn join_collaborator(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(idea_id): Path<Uuid>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let db = state.db.lock().await;
    let idea = db.get_idea(idea_id)?;
    require_open(&idea)?;

    if idea.owner_id == auth.user.id {
        return Err(ApiError::BadRequest(
            "the owner cannot join their own idea as a collaborator".to_string(),
        ));
    }

    db.add_collaborator(auth.user.id, idea_id, req.role.as_deref())?;
    tracing::info!(idea = %idea_id, user = %auth.user.id, "collaborator joined");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "joined": true })),
    ))
}

/// POST /api/collaboration/:idea_id/leave-collaborator
pub async fn leave_collaborator(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(idea_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db.lock().await;
    db.get_idea(idea_id)?;

    let left = db.remove_collaborator(auth.user.id, idea_id)?;
    Ok(Json(serde_json::json!({ "left": left })))
}

/// POST /api/collaboration/:idea_id/request-mentor
///
/// Only users whose top-level role is MENTOR may take the mentor seat.
pub async fn request_mentor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(idea_id): Path<Uuid>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if auth.user.role != UserRole::Mentor {
        return Err(ApiError::Forbidden(
            "only mentors may request the mentor role on an idea".to_string(),
        ));
    }

    let db = state.db.lock().await;
    let idea = db.get_idea(idea_id)?;
    require_open(&idea)?;

    db.add_idea_mentor(auth.user.id, idea_id, req.role.as_deref())?;
    tracing::info!(idea = %idea_id, user = %auth.user.id, "mentor joined");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "joined": true })),
    ))
}

/// GET /api/collaboration/:idea_id/members
pub async fn members(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ApiError> {
    let db = state.db.lock().await;
    db.get_idea(idea_id)?;

    Ok(Json(MembersResponse {
        collaborators: db.list_collaborators(idea_id)?,
        mentors: db.list_idea_mentors(idea_id)?,
    }))
}
