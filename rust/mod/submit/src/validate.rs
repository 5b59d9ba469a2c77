//! Schema gate: three required, non-empty string fields and nothing else.

use serde_json::Value;
use stash_core::{FieldError, FieldReason, ServiceError};

use crate::model::{FIELDS, NewRecord};

/// Check a decoded payload against the record schema.
///
/// Pure. Reports every violation rather than stopping at the first one:
/// schema fields in declaration order, then any unknown keys.
pub fn validate(payload: &Value) -> Result<NewRecord, ServiceError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ServiceError::Validation("request body must be an object".into()))?;

    let mut errors = Vec::new();
    let mut values: [&str; 3] = [""; 3];

    for (slot, field) in values.iter_mut().zip(FIELDS) {
        match obj.get(field) {
            None | Some(Value::Null) => errors.push(FieldError::new(field, FieldReason::Missing)),
            Some(Value::String(s)) if s.is_empty() => {
                errors.push(FieldError::new(field, FieldReason::Empty))
            }
            Some(Value::String(s)) => *slot = s.as_str(),
            Some(_) => errors.push(FieldError::new(field, FieldReason::WrongType)),
        }
    }

    for key in obj.keys().filter(|k| !FIELDS.contains(&k.as_str())) {
        errors.push(FieldError::new(key.as_str(), FieldReason::NotAllowed));
    }

    if !errors.is_empty() {
        return Err(ServiceError::InvalidFields(errors));
    }

    let [ids, password, cookie] = values;
    Ok(NewRecord {
        ids: ids.to_string(),
        password: password.to_string(),
        cookie: cookie.to_string(),
    })
}
