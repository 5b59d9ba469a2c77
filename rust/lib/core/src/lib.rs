pub mod auth;
pub mod config;
pub mod error;
pub mod module;
pub mod types;

pub use auth::{AllowAll, Authenticator, Claims, DenyAll, JwtAuthenticator, Principal};
pub use config::{RateLimitConfig, ServiceConfig};
pub use error::{FieldError, FieldReason, ServiceError};
pub use module::Module;
pub use types::{new_id, now_rfc3339};
