//! Comments and likes on approved ideas.

use axum::extract::{Extension, Json, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use odrlab_store::{Comment, Database, Idea};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

use super::non_empty;

#[derive(Deserialize)]
pub struct PostCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct LikeRequest {
    /// Desired state: true to like, false to unlike.
    pub liked: bool,
    /// When set, the like targets this comment instead of the idea.
    pub comment_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    #[serde(flatten)]
    pub comment: Comment,
    pub likes: i64,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

/// Discussion is only open on published ideas.
fn require_open(idea: &Idea) -> Result<(), ApiError> {
    if !idea.approved {
        return Err(ApiError::BadRequest(
            "discussion is only open on approved ideas".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/discussion/:idea_id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(idea_id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let db = state.db.lock().await;
    db.get_idea(idea_id)?;

    let mut out = Vec::new();
    for comment in db.list_comments_for_idea(idea_id)? {
        let likes = db.count_comment_likes(comment.id)?;
        out.push(CommentResponse { comment, likes });
    }
    Ok(Json(out))
}

/// POST /api/discussion/:idea_id/comments
pub async fn post_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(idea_id): Path<Uuid>,
    Json(req): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    non_empty("content", &req.content)?;

    let db = state.db.lock().await;
    let idea = db.get_idea(idea_id)?;
    require_open(&idea)?;

    let comment = Comment {
        id: Uuid::new_v4(),
        content: req.content,
        idea_id,
        author_id: auth.user.id,
        parent_id: req.parent_id,
        created_at: Utc::now(),
    };
    db.create_comment(&comment)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse { comment, likes: 0 }),
    ))
}

/// DELETE /api/discussion/comments/:id (author or admin)
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.db.lock().await;
    let comment = db.get_comment(id)?;

    if comment.author_id != auth.user.id && !auth.user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "only the author or an admin may delete this comment".to_string(),
        ));
    }

    db.delete_comment(id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /api/discussion/:idea_id/likes
///
/// Idempotent in both directions: liking twice reports `liked: true` both
/// times without a second row, unliking something never liked is a no-op.
pub async fn set_like(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(idea_id): Path<Uuid>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<LikeResponse>, ApiError> {
    let db = state.db.lock().await;
    let idea = db.get_idea(idea_id)?;
    require_open(&idea)?;

    let likes = match req.comment_id {
        Some(comment_id) => {
            let comment = db.get_comment(comment_id)?;
            if comment.idea_id != idea_id {
                return Err(ApiError::BadRequest(
                    "comment does not belong to this idea".to_string(),
                ));
            }
            set_comment_like(&db, auth.user.id, comment_id, req.liked)?
        }
        None => {
            if req.liked {
                db.like_idea(auth.user.id, idea_id)?;
            } else {
                db.unlike_idea(auth.user.id, idea_id)?;
            }
            db.count_idea_likes(idea_id)?
        }
    };

    Ok(Json(LikeResponse {
        liked: req.liked,
        likes,
    }))
}

fn set_comment_like(
    db: &Database,
    user_id: Uuid,
    comment_id: Uuid,
    liked: bool,
) -> Result<i64, ApiError> {
    if liked {
        db.like_comment(user_id, comment_id)?;
    } else {
        db.unlike_comment(user_id, comment_id)?;
    }
    Ok(db.count_comment_likes(comment_id)?)
}
