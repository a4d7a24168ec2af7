use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::errors::{StoreError, UploadError};
use crate::models::{Fields, ProfileRecord, Record, UploadEvent, UploadFile};
use crate::stores::{DocumentStore, ObjectStore};

/// Stateless pass-through layer over a document store and an object store.
///
/// Every operation is one request against the injected backend; no operation
/// depends on another's state, and concurrent calls are independent. Writes
/// to the same record race at the store's consistency level.
#[derive(Clone)]
pub struct DataFacade {
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    upload_prefix: String,
    max_upload_bytes: u64,
}

/// Handle to an upload in flight. The transfer keeps running if the handle
/// is dropped; events are then only visible in the logs.
pub struct UploadHandle {
    key: String,
    events: mpsc::UnboundedReceiver<UploadEvent>,
    task: JoinHandle<()>,
}

impl UploadHandle {
    /// Destination key of the blob being uploaded.
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Next event from the transfer, `None` once the driver has finished and
    /// all events were consumed.
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        self.events.recv().await
    }

    /// Drains events until the terminal one and returns it. `None` means the
    /// driver stopped without reporting an outcome (it was aborted).
    pub async fn wait(mut self) -> Option<UploadEvent> {
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Cancels the transfer driver. No terminal event is delivered.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Destination name for a profile image: `profile.` plus the segment of the
/// original name after the first dot. Multi-dot names therefore pick up the
/// wrong segment (`my.photo.v2.png` becomes `profile.photo`); kept that way
/// for compatibility with paths already written by the previous
/// implementation.
fn destination_name(original: &str) -> String {
    let ext = original.split('.').nth(1).unwrap_or_default();
    format!("profile.{}", ext)
}

impl DataFacade {
    pub fn new(documents: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            documents,
            objects,
            upload_prefix: "images".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_config(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        config: &Config,
    ) -> Self {
        Self {
            documents,
            objects,
            upload_prefix: config.upload_prefix.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Fetches every record in `collection`, each field mapping merged with
    /// its store-assigned id. An unknown collection yields an empty vec.
    pub async fn retrieve_data(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        self.documents.fetch_all(collection).await
    }

    /// Fetches one record's field mapping by id, `None` when the id does not
    /// exist. Unlike `retrieve_data`, the id is not merged into the returned
    /// mapping; callers relying on it must keep the id they passed in.
    pub async fn retrieve_data_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Fields>, StoreError> {
        self.documents.fetch_one(collection, id).await
    }

    /// Equality-filter query shaped for profile resolution: `None` on zero
    /// matches, otherwise every element carries the four profile keys
    /// (possibly null) plus the rest of its fields.
    pub async fn retrieve_data_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Vec<ProfileRecord>>, StoreError> {
        let records = self.documents.query_equals(collection, field, value).await?;

        if records.is_empty() {
            return Ok(None);
        }

        let shaped = records
            .into_iter()
            .map(|record| ProfileRecord::from_fields(record.id, record.fields))
            .collect();

        Ok(Some(shaped))
    }

    /// Merges `patch` into one record. The error carries the cause; callers
    /// that only want the legacy boolean can go through `WriteStatus::from`.
    pub async fn update_data(
        &self,
        collection: &str,
        id: Uuid,
        patch: Fields,
    ) -> Result<(), StoreError> {
        self.documents.update_partial(collection, id, patch).await
    }

    /// Removes one record. Deleting a missing id succeeds; the store's
    /// semantics are passed through, no not-found is synthesized here.
    pub async fn delete_data(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        self.documents.delete(collection, id).await
    }

    /// Starts a profile image upload and hands back a handle for observing
    /// it. The only synchronous failure is the size admission check; once
    /// admitted, progress and the terminal outcome arrive on the handle's
    /// event channel (and in the logs).
    pub fn initiate_upload(
        &self,
        user_id: Uuid,
        file: UploadFile,
    ) -> Result<UploadHandle, UploadError> {
        if file.size >= self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                size: file.size,
                limit: self.max_upload_bytes,
            });
        }

        let key = format!(
            "{}/{}/{}",
            self.upload_prefix,
            user_id,
            destination_name(&file.name)
        );
        let content_type = mime_guess::from_path(&file.name)
            .first_or_octet_stream()
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (progress_tx, mut progress_rx) =
            mpsc::unbounded_channel::<crate::models::UploadProgress>();

        let objects = Arc::clone(&self.objects);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let started = chrono::Utc::now();
            let forward_tx = event_tx.clone();
            let forward_key = task_key.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    debug!(
                        "upload {}: {:.1}% ({}/{} bytes)",
                        forward_key,
                        progress.percent(),
                        progress.bytes_transferred,
                        progress.total_bytes
                    );
                    let _ = forward_tx.send(UploadEvent::Progress(progress));
                }
            });

            let result = objects
                .put(&task_key, file.data, &content_type, &progress_tx)
                .await;

            // Close the progress channel so the forwarder drains and stops
            // before the terminal event goes out.
            drop(progress_tx);
            let _ = forwarder.await;

            match result {
                Ok(()) => match objects.download_url(&task_key).await {
                    Ok(download_url) => {
                        let elapsed_ms = (chrono::Utc::now() - started).num_milliseconds();
                        info!("File available at {} ({} ms)", download_url, elapsed_ms);
                        let _ = event_tx.send(UploadEvent::Completed { download_url });
                    }
                    Err(e) => {
                        error!("Upload of {} completed but URL resolution failed: {}", task_key, e);
                        let _ = event_tx.send(UploadEvent::Failed {
                            error: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    error!("Upload of {} failed: {}", task_key, e);
                    let _ = event_tx.send(UploadEvent::Failed {
                        error: e.to_string(),
                    });
                }
            }
        });

        Ok(UploadHandle {
            key,
            events: event_rx,
            task,
        })
    }

    /// Compatibility surface over `initiate_upload`: resolves as soon as the
    /// transfer is started, not when it completes.
    ///
    /// `None` resolves to `true` without doing anything, and an oversized
    /// file resolves to `false`; those two checks are the only caller-visible
    /// signals. Everything after admission is fire-and-forget.
    pub async fn upload_file(&self, user_id: Uuid, file: Option<UploadFile>) -> bool {
        let Some(file) = file else {
            return true;
        };

        match self.initiate_upload(user_id, file) {
            // Transfer continues in the background; dropping the handle only
            // detaches the event channel.
            Ok(_handle) => true,
            Err(UploadError::TooLarge { size, limit }) => {
                debug!(
                    "rejected upload for user {}: {} bytes over the {} byte limit",
                    user_id, size, limit
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_name_takes_segment_after_first_dot() {
        assert_eq!(destination_name("avatar.png"), "profile.png");
        // First-dot split, preserved: the "extension" of a multi-dot name is
        // the second segment, not the last.
        assert_eq!(destination_name("my.photo.v2.png"), "profile.photo");
        assert_eq!(destination_name("a.b.c.png"), "profile.b");
    }

    #[test]
    fn destination_name_without_extension_is_bare() {
        assert_eq!(destination_name("avatar"), "profile.");
    }
}
