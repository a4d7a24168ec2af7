use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Fields, Record, UploadProgress};

/// Channel used by object store implementations to report transfer progress.
/// Senders must not treat a closed receiver as an error: observers are free
/// to stop listening while the transfer keeps going.
pub type ProgressSender = mpsc::UnboundedSender<UploadProgress>;

/// A named-collection document store with store-assigned ids and
/// query-by-equality support.
///
/// Collection names are caller-supplied at every call; there is no schema
/// registry. Implementations own all persistence; the facade keeps no state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches every record in the collection. An unknown collection is
    /// empty, not an error.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Fetches one record's field mapping by id, `None` when the id does not
    /// exist.
    async fn fetch_one(&self, collection: &str, id: Uuid) -> Result<Option<Fields>, StoreError>;

    /// Returns every record whose `field` equals `value`.
    async fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Record>, StoreError>;

    /// Merges `patch` into an existing record's fields. Updating a missing
    /// record is an error.
    async fn update_partial(
        &self,
        collection: &str,
        id: Uuid,
        patch: Fields,
    ) -> Result<(), StoreError>;

    /// Removes a record. Deleting a missing id succeeds.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError>;
}

/// A binary blob store addressed by path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` at `key`, overwriting any existing blob, reporting
    /// transfer progress through `progress`.
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        progress: &ProgressSender,
    ) -> Result<(), StoreError>;

    /// Resolves a URL from which the blob at `key` can be downloaded.
    async fn download_url(&self, key: &str) -> Result<String, StoreError>;
}
