//! Persistence gateway: the only write path into the document store.

use std::sync::Arc;

use stash_core::{ServiceError, new_id, now_rfc3339};
use stash_kv::{KVError, KVStore};

use crate::model::{NewRecord, Record};
use crate::secret;

/// KV key prefix for record documents.
pub const RECORD_PREFIX: &str = "submit:record:";

/// Creates record documents. Holds the injected store handle.
pub struct RecordStore {
    kv: Arc<dyn KVStore>,
    hash_secrets: bool,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KVStore>, hash_secrets: bool) -> Self {
        Self { kv, hash_secrets }
    }

    fn make_key(id: &str) -> String {
        format!("{}{}", RECORD_PREFIX, id)
    }

    fn kv_err(e: KVError) -> ServiceError {
        ServiceError::Storage(e.to_string())
    }

    /// Insert a new record document and return it with its assigned id and
    /// creation timestamp.
    ///
    /// Hashing and the redb write both block, so they run on the blocking
    /// pool while the request task awaits the result.
    pub async fn create(&self, new: NewRecord) -> Result<Record, ServiceError> {
        let kv = Arc::clone(&self.kv);
        let hash_secrets = self.hash_secrets;
        tokio::task::spawn_blocking(move || create_blocking(kv.as_ref(), hash_secrets, new))
            .await
            .map_err(|e| ServiceError::Internal(format!("store task failed: {}", e)))?
    }

    /// All stored records, ordered by key.
    pub fn list(&self) -> Result<Vec<Record>, ServiceError> {
        let entries = self.kv.scan(RECORD_PREFIX).map_err(Self::kv_err)?;
        entries
            .into_iter()
            .map(|(_key, bytes)| {
                serde_json::from_slice(&bytes)
                    .map_err(|e| ServiceError::Internal(format!("deserialize: {}", e)))
            })
            .collect()
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.kv.scan(RECORD_PREFIX).map_err(Self::kv_err)?.len())
    }
}

fn create_blocking(
    kv: &dyn KVStore,
    hash_secrets: bool,
    new: NewRecord,
) -> Result<Record, ServiceError> {
    let password = if hash_secrets {
        secret::hash_secret(&new.password)
            .map_err(|e| ServiceError::Internal(format!("hash secret: {}", e)))?
    } else {
        new.password
    };

    let record = Record {
        id: new_id(),
        ids: new.ids,
        password,
        cookie: new.cookie,
        created_at: now_rfc3339(),
    };

    let bytes = serde_json::to_vec(&record)
        .map_err(|e| ServiceError::Internal(format!("serialize: {}", e)))?;
    kv.insert_new(&RecordStore::make_key(&record.id), &bytes)
        .map_err(RecordStore::kv_err)?;

    Ok(record)
}
