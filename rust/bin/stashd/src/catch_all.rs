//! Terminal error stage.
//!
//! Anything a handler did not turn into a response itself (a panic) becomes
//! a generic 500 here. The detail goes to the log, never to the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::extract::Request;
use axum::http::Method;
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use stash_core::ServiceError;

pub async fn catch_all(request: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => ServiceError::Internal(format!(
            "request handler panicked: {}",
            panic_message(panic.as_ref())
        ))
        .into_response(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> ServiceError {
    ServiceError::NotFound(format!("Cannot {} {}", method, uri.path()))
}
