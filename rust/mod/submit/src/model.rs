use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema fields, in the order violations are reported.
pub const FIELDS: [&str; 3] = ["ids", "password", "cookie"];

/// A payload that passed validation and is ready to be persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Identifier.
    pub ids: String,
    /// Secret, as submitted.
    pub password: String,
    /// Session token.
    pub cookie: String,
}

impl fmt::Debug for NewRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewRecord")
            .field("ids", &self.ids)
            .field("password", &"<redacted>")
            .field("cookie", &"<redacted>")
            .finish()
    }
}

/// A persisted record document.
///
/// `id` and `created_at` are assigned by the store on creation. `password`
/// holds an argon2id PHC string unless secret hashing is disabled.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub ids: String,
    pub password: String,
    pub cookie: String,
    pub created_at: String,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("ids", &self.ids)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_camel_case() {
        let record = Record {
            id: "abc".into(),
            ids: "u1".into(),
            password: "p1".into(),
            cookie: "c1".into(),
            created_at: "2026-01-01T00:00:00+00:00".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["createdAt"], "2026-01-01T00:00:00+00:00");
        assert_eq!(json["ids"], "u1");
    }

    #[test]
    fn debug_never_prints_secrets() {
        let new = NewRecord {
            ids: "u1".into(),
            password: "hunter2".into(),
            cookie: "session-xyz".into(),
        };
        let out = format!("{:?}", new);
        assert!(out.contains("u1"));
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("session-xyz"));
    }
}
