use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::BytesMut;
use http_body_util::BodyExt;
use serde_json::map::Entry;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use stash_core::{Authenticator, Principal, ServiceError};

use crate::model::NewRecord;
use crate::store::RecordStore;
use crate::validate::validate;

pub const WELCOME_MESSAGE: &str = "Welcome to the API!";
pub const SAVED_MESSAGE: &str = "Data saved successfully!";
pub const SAVE_FAILED_MESSAGE: &str = "Error saving data.";

/// Everything a request needs, injected at construction.
#[derive(Clone)]
pub struct SubmitState {
    pub auth: Arc<dyn Authenticator>,
    pub records: Arc<RecordStore>,
    pub body_limit: usize,
}

pub fn router(state: SubmitState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/send", post(send))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

// ---------------------------------------------------------------------------
// POST /send
// ---------------------------------------------------------------------------

async fn send(State(state): State<SubmitState>, request: Request) -> Response {
    let (principal, new_record) = match admit(&state, request).await {
        Ok(admitted) => admitted,
        Err(e) => {
            warn!(code = e.error_code(), "rejected submission: {}", e);
            return e.into_response();
        }
    };

    match state.records.create(new_record).await {
        Ok(record) => {
            info!(id = %record.id, subject = %principal.subject, "data saved");
            (StatusCode::OK, SAVED_MESSAGE).into_response()
        }
        Err(e) => {
            error!(subject = %principal.subject, "error saving data: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED_MESSAGE).into_response()
        }
    }
}

/// Run the gates in order. Each one either hands its output to the next or
/// short-circuits with a typed failure.
async fn admit(
    state: &SubmitState,
    request: Request,
) -> Result<(Principal, NewRecord), ServiceError> {
    let (parts, body) = request.into_parts();

    let principal = state.auth.authenticate(&parts.headers)?;
    let payload = read_payload(&parts.headers, body, state.body_limit).await?;
    let new_record = validate(&payload)?;

    Ok((principal, new_record))
}

/// Read the body (bounded by `limit`) and decode it by content type.
///
/// JSON and urlencoded forms are understood. Any other or missing content
/// type decodes to an empty object, which the schema then rejects field by
/// field.
async fn read_payload(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Value, ServiceError> {
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > limit) {
        return Err(ServiceError::PayloadTooLarge { limit });
    }

    let mut body = body;
    let mut buf = BytesMut::with_capacity(declared_len.unwrap_or(0));
    while let Some(frame) = body.frame().await {
        let frame = frame
            .map_err(|e| ServiceError::Validation(format!("failed to read request body: {}", e)))?;
        if let Some(chunk) = frame.data_ref() {
            if buf.len() + chunk.len() > limit {
                return Err(ServiceError::PayloadTooLarge { limit });
            }
            buf.extend_from_slice(chunk);
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    decode_payload(&content_type, &buf)
}

fn decode_payload(content_type: &str, bytes: &[u8]) -> Result<Value, ServiceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }

    match content_type {
        "application/json" => serde_json::from_slice(bytes)
            .map_err(|e| ServiceError::Validation(format!("malformed JSON body: {}", e))),
        "application/x-www-form-urlencoded" => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
                .map_err(|e| ServiceError::Validation(format!("malformed form body: {}", e)))?;
            Ok(Value::Object(collect_form(pairs)))
        }
        _ => Ok(Value::Object(Default::default())),
    }
}

/// A key repeated in the form becomes an array of its values, in order.
fn collect_form(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(values) => values.push(value),
                first => *first = Value::Array(vec![first.take(), value]),
            },
        }
    }
    map
}
