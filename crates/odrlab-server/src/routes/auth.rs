//! Account creation and session endpoints.
//!
//! Successful authentication is communicated exclusively through http-only
//! cookies; no endpoint returns a raw token in the JSON body.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Extension, Json, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use odrlab_store::{RoleProfile, StoreError, User, UserRole};

use crate::api::AppState;
use crate::auth::{
    issue_auth_cookies, verify_password, verify_token, AuthUser, TokenUse, REFRESH_COOKIE,
};
use crate::error::ApiError;

use super::{
    non_empty, normalize_email, valid_email, valid_password, write_audit, ProfileInput,
    UserResponse,
};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to INNOVATOR; ADMIN cannot be self-assigned.
    pub role: Option<UserRole>,
    #[serde(default)]
    pub profile: ProfileInput,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct GoogleSigninRequest {
    /// Email asserted by Google; assertion verification happens upstream.
    pub email: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CompleteProfileRequest {
    pub contact_number: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// Optional role switch applied with full transition semantics.
    pub role: Option<UserRole>,
    pub profile: Option<ProfileInput>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct GoogleSigninResponse {
    pub user: UserResponse,
    pub needs_profile_completion: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), ApiError> {
    non_empty("name", &req.name)?;
    valid_email("email", &req.email)?;
    valid_password("password", &req.password)?;

    let role = req.role.unwrap_or(UserRole::Innovator);
    if role.is_admin() {
        return Err(ApiError::Validation {
            field: "role",
            message: "cannot sign up as admin".to_string(),
        });
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        password_hash: Some(crate::auth::hash_password(&req.password)?),
        contact_number: None,
        city: None,
        country: None,
        image_avatar: None,
        role,
        created_at: now,
        updated_at: now,
    };
    let profile = req.profile.into_profile(role);

    let ip = connect_info.map(|c| c.0.ip());
    {
        let mut db = state.db.lock().await;
        db.create_user(&user, profile.as_ref())?;
        write_audit(&db, "signup", Some(&user), None, true, None, ip);
    }

    tracing::info!(user = %user.id, role = %user.role, "new account created");

    let jar = issue_auth_cookies(jar, &state.config, &user)?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            user: UserResponse::new(user, profile),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    valid_email("email", &req.email)?;
    non_empty("password", &req.password)?;

    let email = normalize_email(&req.email);
    let ip = connect_info.map(|c| c.0.ip());

    let db = state.db.lock().await;

    // The generic message below is deliberate: callers must not learn whether
    // the email exists or the password was wrong.
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let user = match db.get_user_by_email(&email) {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            write_audit(&db, "login", None, None, false, Some("unknown email"), ip);
            return Err(invalid());
        }
        Err(other) => return Err(other.into()),
    };

    let verified = user
        .password_hash
        .as_deref()
        .map(|hash| verify_password(hash, &req.password))
        .unwrap_or(false);
    if !verified {
        write_audit(
            &db,
            "login",
            Some(&user),
            None,
            false,
            Some("password mismatch"),
            ip,
        );
        return Err(invalid());
    }

    let profile = db.get_profile(user.id, user.role)?;
    write_audit(&db, "login", Some(&user), None, true, None, ip);
    drop(db);

    let jar = issue_auth_cookies(jar, &state.config, &user)?;
    Ok((
        jar,
        Json(SessionResponse {
            user: UserResponse::new(user, profile),
        }),
    ))
}

/// POST /api/auth/google-signin
pub async fn google_signin(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Json(req): Json<GoogleSigninRequest>,
) -> Result<(CookieJar, Json<GoogleSigninResponse>), ApiError> {
    valid_email("email", &req.email)?;
    non_empty("name", &req.name)?;

    let email = normalize_email(&req.email);
    let ip = connect_info.map(|c| c.0.ip());

    let mut db = state.db.lock().await;

    let (user, profile, needs_profile_completion) = match db.get_user_by_email(&email) {
        Ok(user) => {
            let needs = user.contact_number.is_none()
                || user.city.is_none()
                || user.country.is_none();
            let profile = db.get_profile(user.id, user.role)?;
            (user, profile, needs)
        }
        Err(StoreError::NotFound) => {
            // First Google sign-in: provision an innovator account with no
            // password and an empty extension row.
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                name: req.name.trim().to_string(),
                email,
                password_hash: None,
                contact_number: None,
                city: None,
                country: None,
                image_avatar: None,
                role: UserRole::Innovator,
                created_at: now,
                updated_at: now,
            };
            let profile = RoleProfile::empty(UserRole::Innovator);
            db.create_user(&user, profile.as_ref())?;
            write_audit(&db, "google_signin", Some(&user), None, true, Some("account created"), ip);
            tracing::info!(user = %user.id, "google account provisioned");
            (user, profile, true)
        }
        Err(other) => return Err(other.into()),
    };
    drop(db);

    let jar = issue_auth_cookies(jar, &state.config, &user)?;
    Ok((
        jar,
        Json(GoogleSigninResponse {
            user: UserResponse::new(user, profile),
            needs_profile_completion,
        }),
    ))
}

/// POST /api/auth/complete-profile
pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CompleteProfileRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut user = auth.user;

    if let Some(contact) = req.contact_number {
        user.contact_number = Some(contact);
    }
    if let Some(city) = req.city {
        user.city = Some(city);
    }
    if let Some(country) = req.country {
        user.country = Some(country);
    }
    user.updated_at = Utc::now();

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
            // into_profile returns Some for every non-admin role.
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
    Ok(Json(SessionResponse {
        user: UserResponse::new(user, profile),
    }))
}

/// POST /api/auth/refresh-token
pub async fn refresh_token(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("missing refresh token".to_string()))?;

    let claims = verify_token(&state.config, &token)?;
    if claims.token_use != TokenUse::Refresh {
        return Err(ApiError::Unauthorized(
            "not a refresh token".to_string(),
        ));
    }

    let user_id = claims.subject()?;
    let ip = connect_info.map(|c| c.0.ip());
    let (user, profile) = {
        let db = state.db.lock().await;
        let (user, profile) = db.get_user_with_profile(user_id).map_err(|e| match e {
            StoreError::NotFound => ApiError::Unauthorized("unknown user".to_string()),
            other => ApiError::from(other),
        })?;
        write_audit(&db, "refresh_token", Some(&user), None, true, None, ip);
        (user, profile)
    };

    // Rotation: both tokens are re-issued on every refresh.
    let jar = issue_auth_cookies(jar, &state.config, &user)?;
    Ok((
        jar,
        Json(SessionResponse {
            user: UserResponse::new(user, profile),
        }),
    ))
}

/// GET /api/auth/session
pub async fn session(
    Extension(auth): Extension<AuthUser>,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: UserResponse::new(auth.user, auth.profile),
    })
}
