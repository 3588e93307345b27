//! Server configuration loaded from environment variables.
//!
//! All settings except the token secret have sensible defaults so the server
//! can start with zero configuration for local development.  Without
//! `JWT_SECRET` the server still starts, but every authentication path fails
//! closed with a 500.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DATABASE_PATH`
    /// Default: `./odrlab.db`
    pub database_path: PathBuf,

    /// HMAC secret for signing access/refresh tokens.
    /// Env: `JWT_SECRET`
    /// Default: unset (authentication endpoints fail closed).
    pub jwt_secret: Option<String>,

    /// Deployment mode flag.  Production tightens cookie attributes
    /// (`Secure`, `SameSite=Strict`) and rate limits.
    /// Env: `PRODUCTION` (true/false)
    /// Default: `false`
    pub production: bool,

    /// Exact allowed CORS origin (credentials enabled when set).
    /// Env: `CORS_ORIGIN`
    /// Default: unset (permissive CORS without credentials, dev only).
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: PathBuf::from("./odrlab.db"),
            jwt_secret: None,
            production: false,
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = Some(secret);
            }
        }

        if let Ok(val) = std::env::var("PRODUCTION") {
            config.production = val == "true" || val == "1";
        }

        if let Ok(origin) = std::env::var("CORS_ORIGIN") {
            if !origin.is_empty() {
                config.cors_origin = Some(origin);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
