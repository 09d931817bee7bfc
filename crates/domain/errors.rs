use thiserror::Error;

/// Failure reported by a repository.
///
/// `Conflict` means a storage constraint rejected the write (overlapping room
/// interval, duplicate serial number for a service day, duplicate tran_id).
/// Everything else is `Internal`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
