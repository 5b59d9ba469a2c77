use std::path::PathBuf;
use std::time::Duration;

use crate::ServiceError;

/// Fixed-window rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of one window. All counters reset at each boundary.
    pub window: Duration,
    /// Requests allowed per client address within one window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

/// Runtime configuration shared by the server binary and its modules.
///
/// The binary fills this from CLI flags and environment variables, verifies
/// it, then passes it to storage and module initialization.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen address for the HTTP server.
    pub listen: String,

    /// Path to the redb database file.
    pub db_path: PathBuf,

    /// HMAC secret for bearer tokens.
    pub jwt_secret: String,

    /// Hash the record secret with argon2id before it is persisted.
    pub hash_secrets: bool,

    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,

    pub rate_limit: RateLimitConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            db_path: PathBuf::from("data/stash.redb"),
            jwt_secret: String::new(),
            hash_secrets: true,
            body_limit: 100 * 1024,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Refuse configurations the server cannot run with.
    pub fn verify(&self) -> Result<(), ServiceError> {
        if self.jwt_secret.is_empty() {
            return Err(ServiceError::Validation(
                "JWT secret is empty; set STASH_JWT_SECRET or --jwt-secret".into(),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ServiceError::Validation("database path is empty".into()));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ServiceError::Validation("rate limit window must be positive".into()));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ServiceError::Validation("rate limit quota must be positive".into()));
        }
        if self.body_limit == 0 {
            return Err(ServiceError::Validation("body limit must be positive".into()));
        }
        Ok(())
    }
}
