//! Idea submission and published-idea endpoints.

use axum::extract::{Extension, Json, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use odrlab_store::{Idea, IdeaSubmission};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

use super::{non_empty, IdeaResponse};

#[derive(Deserialize)]
pub struct SubmitIdeaRequest {
    pub title: String,
    pub caption: Option<String>,
    pub description: String,
    pub prior_odr_experience: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateIdeaRequest {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
}

/// POST /api/ideas/submit
///
/// Creates a submission in the un-reviewed holding area; the idea is not
/// published until an admin approves it.
pub async fn submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SubmitIdeaRequest>,
) -> Result<(StatusCode, Json<IdeaSubmission>), ApiError> {
    non_empty("title", &req.title)?;
    non_empty("description", &req.description)?;

    let submission = IdeaSubmission {
        id: Uuid::new_v4(),
        title: req.title.trim().to_string(),
        caption: req.caption,
        description: req.description,
        prior_odr_experience: req.prior_odr_experience,
        owner_id: auth.user.id,
        reviewed: false,
        approved: false,
        rejected: false,
        rejection_reason: None,
        reviewed_at: None,
        reviewed_by: None,
        created_at: Utc::now(),
    };

    let db = state.db.lock().await;
    db.create_submission(&submission)?;

    tracing::info!(submission = %submission.id, owner = %auth.user.id, "idea submitted for review");

    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/ideas/submissions
///
/// The caller's own submissions, including reviewed ones.
pub async fn my_submissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<IdeaSubmission>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_submissions_for_owner(auth.user.id)?))
}

/// GET /api/ideas/approved
pub async fn list_approved(
    State(state): State<AppState>,
) -> Result<Json<Vec<IdeaResponse>>, ApiError> {
    let db = state.db.lock().await;

    let mut out = Vec::new();
    for idea in db.list_approved_ideas()? {
        out.push(IdeaResponse::load(&db, idea)?);
    }
    Ok(Json(out))
}

/// GET /api/ideas/:id
pub async fn get_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<IdeaResponse>, ApiError> {
    let db = state.db.lock().await;
    let idea = db.get_idea(id)?;

    // Unpublished ideas are only visible to their owner and admins.
    if !idea.approved && idea.owner_id != auth.user.id && !auth.user.role.is_admin() {
        return Err(ApiError::NotFound("record not found".to_string()));
    }

    Ok(Json(IdeaResponse::load(&db, idea)?))
}

/// PUT /api/ideas/:id (owner or admin)
pub async fn update_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateIdeaRequest>,
) -> Result<Json<IdeaResponse>, ApiError> {
    let db = state.db.lock().await;
    let mut idea = db.get_idea(id)?;
    require_owner_or_admin(&auth, &idea)?;

    if let Some(title) = req.title {
        non_empty("title", &title)?;
        idea.title = title.trim().to_string();
    }
    if let Some(caption) = req.caption {
        idea.caption = Some(caption);
    }
    if let Some(description) = req.description {
        non_empty("description", &description)?;
        idea.description = description;
    }

    db.update_idea(&idea)?;
    Ok(Json(IdeaResponse::load(&db, idea)?))
}

/// DELETE /api/ideas/:id (owner or admin)
pub async fn delete_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db.lock().await;
    let idea = db.get_idea(id)?;
    require_owner_or_admin(&auth, &idea)?;

    db.delete_idea(id)?;
    tracing::info!(idea = %id, by = %auth.user.id, "idea deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

fn require_owner_or_admin(auth: &AuthUser, idea: &Idea) -> Result<(), ApiError> {
    if idea.owner_id == auth.user.id || auth.user.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "only the owner or an admin may modify this idea".to_string(),
        ))
    }
}
