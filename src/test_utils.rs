//! In-memory store implementations for unit and integration tests.
//!
//! Both fakes support failure injection so tests can exercise the facade's
//! write-failure and upload-failure paths without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Fields, Record, UploadProgress};
use crate::stores::{DocumentStore, ObjectStore, ProgressSender};

/// Document store backed by a map, insertion-ordered per collection.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<(Uuid, Fields)>>>,
    deny_writes: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail with a permission error, simulating
    /// backend rules rejecting them.
    pub fn deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    pub fn insert(&self, collection: &str, fields: Fields) -> Uuid {
        let id = Uuid::new_v4();
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .push((id, fields));
        id
    }

    pub fn record_count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().unwrap();
        collections.get(collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let records = collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, fields)| Record {
                        id: *id,
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn fetch_one(&self, collection: &str, id: Uuid) -> Result<Option<Fields>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let fields = collections.get(collection).and_then(|records| {
            records
                .iter()
                .find(|(record_id, _)| *record_id == id)
                .map(|(_, fields)| fields.clone())
        });
        Ok(fields)
    }

    async fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let records = collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, fields)| {
                        fields.get(field).and_then(|v| v.as_str()) == Some(value)
                    })
                    .map(|(id, fields)| Record {
                        id: *id,
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn update_partial(
        &self,
        collection: &str,
        id: Uuid,
        patch: Fields,
    ) -> Result<(), StoreError> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(StoreError::permission_denied("writes are denied"));
        }

        let mut collections = self.collections.lock().unwrap();
        let record = collections.get_mut(collection).and_then(|records| {
            records
                .iter_mut()
                .find(|(record_id, _)| *record_id == id)
                .map(|(_, fields)| fields)
        });

        match record {
            Some(fields) => {
                for (key, value) in patch {
                    fields.insert(key, value);
                }
                Ok(())
            }
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(StoreError::permission_denied("writes are denied"));
        }

        let mut collections = self.collections.lock().unwrap();
        if let Some(records) = collections.get_mut(collection) {
            records.retain(|(record_id, _)| *record_id != id);
        }
        // Deleting a missing id is a success, per the store semantics the
        // facade passes through.
        Ok(())
    }
}

/// Object store backed by a map. Uploads report progress in a handful of
/// chunks so tests can observe intermediate events.
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    base_url: String,
    fail_puts: AtomicBool,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            base_url: "memory://bucket".to_string(),
            fail_puts: AtomicBool::new(false),
        }
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent puts fail, simulating a transport error mid-upload.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
        progress: &ProgressSender,
    ) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow!("injected transport failure")));
        }

        let total_bytes = data.len() as u64;
        let chunk = (total_bytes / 4).max(1);
        let mut bytes_transferred = 0;
        while bytes_transferred < total_bytes {
            bytes_transferred = (bytes_transferred + chunk).min(total_bytes);
            let _ = progress.send(UploadProgress {
                bytes_transferred,
                total_bytes,
            });
        }
        if total_bytes == 0 {
            let _ = progress.send(UploadProgress {
                bytes_transferred: 0,
                total_bytes: 0,
            });
        }

        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, StoreError> {
        let objects = self.objects.lock().unwrap();
        if !objects.contains_key(key) {
            return Err(StoreError::Backend(anyhow!("no object at {}", key)));
        }
        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_fields(email: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("email".to_string(), json!(email));
        fields
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("users", user_fields("a@b.c"));

        let fetched = store.fetch_one("users", id).await.unwrap().unwrap();
        assert_eq!(fetched.get("email"), Some(&json!("a@b.c")));
        assert!(store.fetch_one("users", Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn denied_writes_report_permission_errors() {
        let store = MemoryDocumentStore::new();
        let id = store.insert("users", user_fields("a@b.c"));
        store.deny_writes(true);

        let result = store.update_partial("users", id, Fields::new()).await;
        assert!(matches!(result, Err(StoreError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn object_put_reports_monotonic_progress() {
        let store = MemoryObjectStore::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        store
            .put("images/u/profile.png", vec![0u8; 100], "image/png", &tx)
            .await
            .unwrap();
        drop(tx);

        let mut last = 0;
        while let Some(progress) = rx.recv().await {
            assert!(progress.bytes_transferred >= last);
            assert_eq!(progress.total_bytes, 100);
            last = progress.bytes_transferred;
        }
        assert_eq!(last, 100);
        assert!(store.contains("images/u/profile.png"));
    }
}
