//! Authentication gate.
//!
//! Modules do NOT depend on a specific credential scheme. They only know
//! the [`Authenticator`] trait; the concrete implementation is injected at
//! startup time.

use std::time::Duration;

use axum::http::{HeaderMap, header};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Identity of an accepted caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

/// Pluggable, stateless request gate.
///
/// Receives only the request headers. The body has not been read when this
/// runs, so a rejection never costs a body read or a store round-trip.
pub trait Authenticator: Send + Sync + 'static {
    /// Accept the request and return the caller, or reject it with
    /// `ServiceError::Unauthorized`.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ServiceError>;
}

/// Accepts everything. Used for testing and local development.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Principal, ServiceError> {
        Ok(Principal {
            subject: "anonymous".to_string(),
        })
    }
}

/// Rejects everything. Used for testing.
pub struct DenyAll;

impl Authenticator for DenyAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Principal, ServiceError> {
        Err(ServiceError::Unauthorized("access denied".into()))
    }
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: who the token was issued to.
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// HS256 bearer-token authenticator.
///
/// Extracts the JWT from `Authorization: Bearer <token>` and validates its
/// signature and expiry. Holds no per-session state.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Create an authenticator from a shared HMAC secret.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Issue a token for `subject`, valid for `ttl`.
    ///
    /// A `ttl` whose expiry does not fit a unix timestamp is rejected.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, ServiceError> {
        let now = chrono::Utc::now().timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| {
                ServiceError::Validation(format!("token lifetime of {}s is too long", ttl.as_secs()))
            })?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(format!("encode token: {}", e)))
    }

    /// Validate a raw token string.
    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ServiceError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))?;

        let claims = self.verify(token)?;
        Ok(Principal {
            subject: claims.sub,
        })
    }
}
