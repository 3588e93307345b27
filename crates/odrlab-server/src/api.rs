//! HTTP API assembly: application state, router construction and serving.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use odrlab_store::Database;

use crate::auth::require_auth;
use crate::config::ServerConfig;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::routes;

/// Shared application state.  The store handle is mutex-guarded because the
/// underlying SQLite connection is single-threaded; handlers hold the lock
/// only for the duration of their queries.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
    pub rate_limiter: RateLimiter,
    pub submit_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let production = config.production;
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            rate_limiter: RateLimiter::global(production),
            submit_limiter: RateLimiter::submission(production),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/google-signin", post(routes::auth::google_signin))
        .route("/api/auth/refresh-token", post(routes::auth::refresh_token))
        .route("/api/ideas/approved", get(routes::ideas::list_approved));

    let protected = Router::new()
        .route("/api/auth/session", get(routes::auth::session))
        .route(
            "/api/auth/complete-profile",
            post(routes::auth::complete_profile),
        )
        .route(
            "/api/user/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/api/user/apply-mentor", post(routes::users::apply_mentor))
        .route(
            "/api/ideas/submit",
            post(routes::ideas::submit).route_layer(middleware::from_fn_with_state(
                state.submit_limiter.clone(),
                rate_limit_middleware,
            )),
        )
        .route("/api/ideas/submissions", get(routes::ideas::my_submissions))
        .route(
            "/api/ideas/:id",
            get(routes::ideas::get_idea)
                .put(routes::ideas::update_idea)
                .delete(routes::ideas::delete_idea),
        )
        .route(
            "/api/admin/submissions",
            get(routes::admin::list_submissions),
        )
        .route("/api/admin/approve-idea", post(routes::admin::approve_idea))
        .route("/api/admin/reject-idea", post(routes::admin::reject_idea))
        .route(
            "/api/admin/mentor-applications",
            get(routes::admin::mentor_applications),
        )
        .route(
            "/api/admin/approve-mentor",
            post(routes::admin::approve_mentor),
        )
        .route(
            "/api/admin/approve-mentor/reject",
            post(routes::admin::reject_mentor),
        )
        .route("/api/admin/users", get(routes::admin::list_users))
        .route(
            "/api/admin/users/:id",
            put(routes::admin::update_user).delete(routes::admin::delete_user),
        )
        .route("/api/admin/ideas", post(routes::admin::create_idea))
        .route(
            "/api/discussion/:idea_id/comments",
            get(routes::discussion::list_comments).post(routes::discussion::post_comment),
        )
        .route(
            "/api/discussion/comments/:id",
            delete(routes::discussion::delete_comment),
        )
        .route(
            "/api/discussion/:idea_id/likes",
            post(routes::discussion::set_like),
        )
        .route(
            "/api/collaboration/:idea_id/join-collaborator",
            post(routes::collaboration::join_collaborator),
        )
        .route(
            "/api/collaboration/:idea_id/leave-collaborator",
            post(routes::collaboration::leave_collaborator),
        )
        .route(
            "/api/collaboration/:idea_id/request-mentor",
            post(routes::collaboration::request_mentor),
        )
        .route(
            "/api/collaboration/:idea_id/members",
            get(routes::collaboration::members),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    match config
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        // Exact origin with credentials: the cookie-based auth contract
        // requires it in production.
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use odrlab_store::{Idea, User, UserRole};

    use crate::auth::{issue_token_with_ttl, TokenUse};

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("api.db")).unwrap();
        let config = ServerConfig {
            jwt_secret: Some("api-test-secret".to_string()),
            ..Default::default()
        };
        (AppState::new(db, config), dir)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Collapse Set-Cookie headers into a Cookie header value.
    fn cookies_of(response: &axum::response::Response) -> String {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    async fn seed_admin(state: &AppState) -> User {
        let now = Utc::now();
        let admin = User {
            id: Uuid::new_v4(),
            name: "Admin".to_string(),
            email: "admin@odrlab.test".to_string(),
            password_hash: None,
            contact_number: None,
            city: None,
            country: None,
            image_avatar: None,
            role: UserRole::Admin,
            created_at: now,
            updated_at: now,
        };
        state.db.lock().await.create_user(&admin, None).unwrap();
        admin
    }

    fn bearer(state: &AppState, user: &User) -> String {
        let token =
            issue_token_with_ttl(&state.config, user, TokenUse::Access, 600).unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn signup_then_login_flow() {
        let (state, _dir) = test_state();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "name": "A",
                    "email": "a@x.com",
                    "password": "longenough1",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = cookies_of(&response);
        assert!(cookies.contains("access_token="));
        assert!(cookies.contains("refresh_token="));
        assert!(cookies.contains("odrindia_session="));

        let body = body_json(response).await;
        assert_eq!(body["user"]["role"], "INNOVATOR");
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("password_hash").is_none());

        // Same credentials log in; the body carries no token and no password.
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "email": "A@X.com ", "password": "longenough1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookies_of(&response).contains("access_token="));
        let body = body_json(response).await;
        assert!(body.get("token").is_none());
        assert!(body["user"].get("password_hash").is_none());

        // Wrong password and unknown email get the same generic message.
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "email": "a@x.com", "password": "wrong-password" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid email or password");

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "email": "nobody@x.com", "password": "longenough1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid email or password");
    }

    #[tokio::test]
    async fn submit_approve_and_list_flow() {
        let (state, _dir) = test_state();
        let admin = seed_admin(&state).await;
        let admin_auth = bearer(&state, &admin);
        let app = build_router(state);

        // Signup and keep the session cookies.
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "name": "Submitter",
                    "email": "submit@x.com",
                    "password": "longenough1",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = cookies_of(&response);

        // Authenticated submission lands in the review queue.
        let mut request = json_request(
            "POST",
            "/api/ideas/submit",
            serde_json::json!({
                "title": "Mediation triage bot",
                "description": "Routes disputes to the right resolution track.",
            }),
        );
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let submission = body_json(response).await;
        assert_eq!(submission["reviewed"], false);
        let submission_id = submission["id"].as_str().unwrap().to_string();

        // Admin approves, using the legacy `ideaId` field name.
        let mut request = json_request(
            "POST",
            "/api/admin/approve-idea",
            serde_json::json!({ "ideaId": submission_id }),
        );
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, admin_auth.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let idea = body_json(response).await;
        assert_eq!(idea["approved"], true);
        assert_eq!(idea["title"], "Mediation triage bot");
        let idea_id = idea["id"].as_str().unwrap().to_string();

        // Double approval is a conflict, not a duplicate idea.
        let mut request = json_request(
            "POST",
            "/api/admin/approve-idea",
            serde_json::json!({ "ideaId": submission_id }),
        );
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, admin_auth.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // The idea is publicly listed exactly once.
        let response = app.oneshot(get_request("/api/ideas/approved")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        let ids: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|i| i["id"].as_str())
            .collect();
        assert_eq!(ids, vec![idea_id.as_str()]);
    }

    #[tokio::test]
    async fn auth_middleware_rejections() {
        let (state, _dir) = test_state();
        let admin = seed_admin(&state).await;
        let expired = issue_token_with_ttl(&state.config, &admin, TokenUse::Access, -7200).unwrap();
        let app = build_router(state);

        // No token at all.
        let response = app
            .clone()
            .oneshot(get_request("/api/auth/session"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Expired token carries the distinguished reason.
        let mut request = get_request("/api/auth/session");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {expired}").parse().unwrap(),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["reason"], "expired");

        // Garbage token.
        let mut request = get_request("/api/auth/session");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            "Bearer not.a.token".parse().unwrap(),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_rotates_cookies() {
        let (state, _dir) = test_state();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "name": "R",
                    "email": "r@x.com",
                    "password": "longenough1",
                }),
            ))
            .await
            .unwrap();
        let cookies = cookies_of(&response);

        let mut request = json_request("POST", "/api/auth/refresh-token", serde_json::json!({}));
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let rotated = cookies_of(&response);
        assert!(rotated.contains("access_token="));
        assert!(rotated.contains("refresh_token="));

        // An access token cannot be replayed as a refresh token.
        let access_only = cookies
            .split("; ")
            .filter(|c| c.starts_with("access_token="))
            .map(|c| format!("refresh_token={}", c.trim_start_matches("access_token=")))
            .collect::<Vec<_>>()
            .join("; ");
        let mut request = json_request("POST", "/api/auth/refresh-token", serde_json::json!({}));
        request
            .headers_mut()
            .insert(header::COOKIE, access_only.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn ownership_guard_on_ideas() {
        let (state, _dir) = test_state();

        // Owner and idea seeded directly in the store.
        let now = Utc::now();
        let owner = User {
            id: Uuid::new_v4(),
            name: "Owner".to_string(),
            email: "owner@odrlab.test".to_string(),
            password_hash: None,
            contact_number: None,
            city: None,
            country: None,
            image_avatar: None,
            role: UserRole::Innovator,
            created_at: now,
            updated_at: now,
        };
        let idea = Idea {
            id: Uuid::new_v4(),
            title: "Owned idea".to_string(),
            caption: None,
            description: "Mine".to_string(),
            owner_id: owner.id,
            approved: true,
            created_at: now,
        };
        {
            let mut db = state.db.lock().await;
            db.create_user(
                &owner,
                odrlab_store::RoleProfile::empty(UserRole::Innovator).as_ref(),
            )
            .unwrap();
            db.create_idea(&idea).unwrap();
        }

        let app = build_router(state.clone());

        // A different authenticated user cannot edit or delete it.
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "name": "Intruder",
                    "email": "intruder@x.com",
                    "password": "longenough1",
                }),
            ))
            .await
            .unwrap();
        let cookies = cookies_of(&response);

        let mut request = json_request(
            "PUT",
            &format!("/api/ideas/{}", idea.id),
            serde_json::json!({ "title": "Hijacked" }),
        );
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let mut request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/ideas/{}", idea.id))
            .body(Body::empty())
            .unwrap();
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // The owner's own bearer token may edit.
        let mut request = json_request(
            "PUT",
            &format!("/api/ideas/{}", idea.id),
            serde_json::json!({ "title": "Still mine" }),
        );
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, bearer(&state, &owner).parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mentor_application_http_flow() {
        let (state, _dir) = test_state();
        let admin = seed_admin(&state).await;
        let admin_auth = bearer(&state, &admin);
        let app = build_router(state);

        // Sign up as OTHER and apply for mentorship.
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "name": "Applicant",
                    "email": "applicant@x.com",
                    "password": "longenough1",
                    "role": "OTHER",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies = cookies_of(&response);
        let body = body_json(response).await;
        let user_id = body["user"]["id"].as_str().unwrap().to_string();

        let mut request = json_request(
            "POST",
            "/api/user/apply-mentor",
            serde_json::json!({ "mentor_type": "LEGAL_EXPERT" }),
        );
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The application shows up for the admin.
        let mut request = get_request("/api/admin/mentor-applications");
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, admin_auth.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        // Approval flips the role to MENTOR.
        let mut request = json_request(
            "POST",
            "/api/admin/approve-mentor",
            serde_json::json!({ "user_id": user_id }),
        );
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, admin_auth.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["role"], "MENTOR");
        assert_eq!(body["profile"]["approved"], true);

        // The new mentor's session reflects the flip.
        let mut request = get_request("/api/auth/session");
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["user"]["role"], "MENTOR");

        // A second approval is a conflict.
        let mut request = json_request(
            "POST",
            "/api/admin/approve-mentor",
            serde_json::json!({ "user_id": body["user"]["id"] }),
        );
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, admin_auth.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn admin_routes_refuse_non_admins() {
        let (state, _dir) = test_state();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "name": "Regular",
                    "email": "regular@x.com",
                    "password": "longenough1",
                }),
            ))
            .await
            .unwrap();
        let cookies = cookies_of(&response);

        let mut request = get_request("/api/admin/users");
        request
            .headers_mut()
            .insert(header::COOKIE, cookies.parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
