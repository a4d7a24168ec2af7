use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the document and object store backends.
///
/// Read operations on the facade propagate these unchanged; write operations
/// return them as the discriminated cause that the legacy boolean status used
/// to discard.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {id} not found in collection {collection}")]
    NotFound { collection: String, id: Uuid },

    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: Uuid) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id,
        }
    }

    pub fn permission_denied<S: Into<String>>(reason: S) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }
}

/// Errors reported synchronously by upload initiation.
///
/// This is deliberately narrow: the size check is the only upload failure the
/// caller sees directly. Transport failures after admission travel on the
/// upload event channel and the diagnostic log.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file of {size} bytes exceeds the upload limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}
