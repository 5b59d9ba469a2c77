use crate::error::KVError;

/// KVStore is the document store behind the service: JSON documents keyed by
/// namespaced strings such as `submit:record:{id}`.
///
/// The service only ever creates documents. `get` and `scan` exist so tests
/// and operators can observe what was written.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    ///
    /// Inspection only; the request path never reads.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Insert a new key. Returns KVError::Exists if the key is already present;
    /// the existing value is left untouched.
    fn insert_new(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
