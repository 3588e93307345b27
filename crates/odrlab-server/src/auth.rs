//! Authentication: token issuance/verification, password hashing, cookies,
//! and the middleware that resolves a request to a user.
//!
//! Tokens are HS256 JWTs signed with the configured secret.  The secret is
//! optional in configuration but mandatory here: every path through this
//! module fails closed with an internal error when it is absent.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use odrlab_store::{RoleProfile, StoreError, User};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
/// Base64-JSON session cookie kept for backward compatibility with older
/// frontend builds; not required by any core flow.
pub const LEGACY_SESSION_COOKIE: &str = "odrindia_session";

pub const ACCESS_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const LEGACY_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
    #[default]
    Access,
    Refresh,
}

/// JWT claims.  New tokens carry the user id in `sub`; `id` and `userId` are
/// accepted on verification for compatibility with tokens minted by earlier
/// deployments.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub token_use: TokenUse,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Resolve the user id from whichever claim name carries it.
    pub fn subject(&self) -> Result<Uuid, ApiError> {
        let raw = self
            .sub
            .as_deref()
            .or(self.id.as_deref())
            .or(self.user_id.as_deref())
            .ok_or_else(|| ApiError::Unauthorized("token carries no user id".to_string()))?;

        Uuid::parse_str(raw)
            .map_err(|_| ApiError::Unauthorized("invalid token subject".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Token issuance / verification
// ---------------------------------------------------------------------------

fn jwt_secret(config: &ServerConfig) -> Result<&str, ApiError> {
    // Fail closed: an unset secret must never authenticate anyone.
    config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("JWT_SECRET is not configured".to_string()))
}

/// Sign a token for `user` with the standard TTL for its use.
pub fn issue_token(config: &ServerConfig, user: &User, usage: TokenUse) -> Result<String, ApiError> {
    let ttl = match usage {
        TokenUse::Access => ACCESS_TTL_SECS,
        TokenUse::Refresh => REFRESH_TTL_SECS,
    };
    issue_token_with_ttl(config, user, usage, ttl)
}

pub(crate) fn issue_token_with_ttl(
    config: &ServerConfig,
    user: &User,
    usage: TokenUse,
    ttl_secs: i64,
) -> Result<String, ApiError> {
    let secret = jwt_secret(config)?;
    let now = Utc::now().timestamp();

    let claims = Claims {
        sub: Some(user.id.to_string()),
        id: None,
        user_id: None,
        role: Some(user.role.as_str().to_string()),
        token_use: usage,
        iat: now,
        exp: now + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

/// Verify a token signature and expiry.  Expired tokens are reported with a
/// distinguished error so clients know to refresh.
pub fn verify_token(config: &ServerConfig, token: &str) -> Result<Claims, ApiError> {
    let secret = jwt_secret(config)?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
        _ => ApiError::Unauthorized("invalid authentication token".to_string()),
    })
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored hash.  Any parse or verify failure is
/// simply "no match"; callers must not distinguish.
pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Cookies
// ---------------------------------------------------------------------------

fn build_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    config: &ServerConfig,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(max_age_secs));
    cookie.set_secure(config.production);
    cookie.set_same_site(if config.production {
        SameSite::Strict
    } else {
        SameSite::Lax
    });
    cookie
}

fn legacy_session_value(user: &User) -> String {
    let payload = serde_json::json!({
        "userId": user.id,
        "role": user.role,
        "issuedAt": Utc::now().to_rfc3339(),
    });
    BASE64.encode(payload.to_string())
}

/// Issue the full cookie set (access, refresh, legacy session) for `user`.
/// Tokens never appear in response bodies; these cookies are the contract.
pub fn issue_auth_cookies(
    jar: CookieJar,
    config: &ServerConfig,
    user: &User,
) -> Result<CookieJar, ApiError> {
    let access = issue_token(config, user, TokenUse::Access)?;
    let refresh = issue_token(config, user, TokenUse::Refresh)?;

    Ok(jar
        .add(build_cookie(ACCESS_COOKIE, access, ACCESS_TTL_SECS, config))
        .add(build_cookie(REFRESH_COOKIE, refresh, REFRESH_TTL_SECS, config))
        .add(build_cookie(
            LEGACY_SESSION_COOKIE,
            legacy_session_value(user),
            LEGACY_SESSION_TTL_SECS,
            config,
        )))
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Effective profile: the extension row matching the current role.
    pub profile: Option<RoleProfile>,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin access required".to_string()))
        }
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Resolve the caller from the bearer header or access cookie, load the user
/// together with its effective profile, and attach it to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)
        .or_else(|| jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| ApiError::Unauthorized("missing authentication token".to_string()))?;

    let claims = verify_token(&state.config, &token)?;
    if claims.token_use != TokenUse::Access {
        return Err(ApiError::Unauthorized(
            "refresh token cannot be used for access".to_string(),
        ));
    }

    let user_id = claims.subject()?;
    let auth = {
        let db = state.db.lock().await;
        let (user, profile) = db.get_user_with_profile(user_id).map_err(|e| match e {
            StoreError::NotFound => ApiError::Unauthorized("unknown user".to_string()),
            other => ApiError::from(other),
        })?;
        AuthUser { user, profile }
    };

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use odrlab_store::UserRole;

    fn test_config() -> ServerConfig {
        ServerConfig {
            jwt_secret: Some("unit-test-secret".to_string()),
            ..Default::default()
        }
    }

    fn test_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Auth Tester".to_string(),
            email: "auth@x.com".to_string(),
            password_hash: None,
            contact_number: None,
            city: None,
            country: None,
            image_avatar: None,
            role: UserRole::Innovator,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let config = test_config();
        let user = test_user();

        let token = issue_token(&config, &user, TokenUse::Access).unwrap();
        let claims = verify_token(&config, &token).unwrap();

        assert_eq!(claims.subject().unwrap(), user.id);
        assert_eq!(claims.token_use, TokenUse::Access);
        assert_eq!(claims.role.as_deref(), Some("INNOVATOR"));
    }

    #[test]
    fn expired_token_is_distinguished() {
        let config = test_config();
        let user = test_user();

        let token =
            issue_token_with_ttl(&config, &user, TokenUse::Access, -2 * 60 * 60).unwrap();
        let err = verify_token(&config, &token).unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }

    #[test]
    fn legacy_claim_names_resolve() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();

        // A token minted by an earlier deployment: user id under `id`.
        #[derive(Serialize)]
        struct LegacyClaims {
            id: String,
            iat: i64,
            exp: i64,
        }
        let token = encode(
            &Header::default(),
            &LegacyClaims {
                id: user_id.to_string(),
                iat: now,
                exp: now + 600,
            },
            &EncodingKey::from_secret("unit-test-secret".as_bytes()),
        )
        .unwrap();

        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.subject().unwrap(), user_id);
        // Missing token_use defaults to access.
        assert_eq!(claims.token_use, TokenUse::Access);
    }

    #[test]
    fn missing_secret_fails_closed() {
        let config = ServerConfig::default();
        let user = test_user();

        let err = issue_token(&config, &user, TokenUse::Access).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));

        let err = verify_token(&config, "not-even-a-token").unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let user = test_user();
        let token = issue_token(&config, &user, TokenUse::Access).unwrap();

        let other = ServerConfig {
            jwt_secret: Some("different-secret".to_string()),
            ..Default::default()
        };
        let err = verify_token(&other, &token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("longenough1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "longenough1"));
        assert!(!verify_password(&hash, "wrong-password"));
        assert!(!verify_password("not-a-hash", "longenough1"));
    }
}
