use thiserror::Error;

#[derive(Error, Debug)]
pub enum KVError {
    #[error("key already exists: {0}")]
    Exists(String),

    #[error("storage error: {0}")]
    Storage(String),
}
