use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use storekit::errors::{StoreError, UploadError};
use storekit::facade::DataFacade;
use storekit::models::{UploadEvent, UploadFile};
use storekit::stores::{ObjectStore, ProgressSender};
use storekit::test_utils::{MemoryDocumentStore, MemoryObjectStore};

fn facade_with_objects() -> (DataFacade, Arc<MemoryObjectStore>) {
    // RUST_LOG=debug surfaces the driver's progress/completion logging.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let documents = Arc::new(MemoryDocumentStore::new());
    let objects = Arc::new(MemoryObjectStore::new());
    let facade = DataFacade::new(documents, objects.clone());
    (facade, objects)
}

#[tokio::test]
async fn upload_under_the_limit_is_admitted_and_completes() {
    let (facade, objects) = facade_with_objects();
    let user_id = Uuid::new_v4();
    // Declared size one byte under the 1 MiB limit.
    let file = UploadFile {
        name: "avatar.png".to_string(),
        size: 1_048_575,
        data: vec![7u8; 64],
    };

    let handle = facade.initiate_upload(user_id, file).unwrap();
    let key = handle.storage_key().to_string();
    assert_eq!(key, format!("images/{}/profile.png", user_id));

    let terminal = handle.wait().await.unwrap();
    match terminal {
        UploadEvent::Completed { download_url } => {
            assert!(download_url.ends_with(&key));
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(objects.contains(&key));
}

#[tokio::test]
async fn upload_at_the_limit_is_rejected_without_initiating() {
    let (facade, objects) = facade_with_objects();
    let file = UploadFile {
        name: "avatar.png".to_string(),
        size: 1_048_576,
        data: vec![7u8; 64],
    };

    let result = facade.initiate_upload(Uuid::new_v4(), file.clone());
    assert!(matches!(
        result,
        Err(UploadError::TooLarge {
            size: 1_048_576,
            limit: 1_048_576
        })
    ));

    assert!(!facade.upload_file(Uuid::new_v4(), Some(file)).await);
    assert_eq!(objects.object_count(), 0);
}

#[tokio::test]
async fn upload_file_resolves_true_once_initiated() {
    let (facade, _objects) = facade_with_objects();
    let file = UploadFile::new("avatar.png", vec![7u8; 64]);

    assert!(facade.upload_file(Uuid::new_v4(), Some(file)).await);
}

#[tokio::test]
async fn upload_of_nothing_is_a_vacuous_success() {
    let (facade, objects) = facade_with_objects();

    assert!(facade.upload_file(Uuid::new_v4(), None).await);
    assert_eq!(objects.object_count(), 0);
}

#[tokio::test]
async fn multi_dot_names_keep_the_first_dot_split() {
    let (facade, objects) = facade_with_objects();
    let user_id = Uuid::new_v4();
    let file = UploadFile {
        name: "a.b.c.png".to_string(),
        size: 100,
        data: vec![1u8; 100],
    };

    let handle = facade.initiate_upload(user_id, file).unwrap();
    // The destination extension is the segment after the first dot, not the
    // real extension.
    let expected = format!("images/{}/profile.b", user_id);
    assert_eq!(handle.storage_key(), expected);

    handle.wait().await.unwrap();
    assert!(objects.contains(&expected));
}

#[tokio::test]
async fn repeated_uploads_overwrite_the_same_path() {
    let (facade, objects) = facade_with_objects();
    let user_id = Uuid::new_v4();
    let key = format!("images/{}/profile.png", user_id);

    let first = facade
        .initiate_upload(user_id, UploadFile::new("old.png", vec![1u8; 8]))
        .unwrap();
    first.wait().await.unwrap();

    let second = facade
        .initiate_upload(user_id, UploadFile::new("new.png", vec![2u8; 8]))
        .unwrap();
    second.wait().await.unwrap();

    assert_eq!(objects.object_count(), 1);
    assert_eq!(objects.get(&key), Some(vec![2u8; 8]));
}

#[tokio::test]
async fn progress_events_precede_the_terminal_event() {
    let (facade, _objects) = facade_with_objects();
    let mut handle = facade
        .initiate_upload(Uuid::new_v4(), UploadFile::new("avatar.png", vec![0u8; 1000]))
        .unwrap();

    let mut saw_progress = false;
    let mut terminal = None;
    while let Some(event) = handle.next_event().await {
        match event {
            UploadEvent::Progress(progress) => {
                assert!(progress.percent() <= 100.0);
                saw_progress = true;
                assert!(terminal.is_none());
            }
            other => terminal = Some(other),
        }
    }

    assert!(saw_progress);
    assert!(matches!(terminal, Some(UploadEvent::Completed { .. })));
}

#[tokio::test]
async fn transport_failure_surfaces_only_on_the_event_channel() {
    let (facade, objects) = facade_with_objects();
    objects.fail_puts(true);

    let file = UploadFile::new("avatar.png", vec![0u8; 64]);
    let handle = facade.initiate_upload(Uuid::new_v4(), file).unwrap();

    // Initiation itself reported no error; the failure arrives as an event.
    let terminal = handle.wait().await.unwrap();
    assert!(matches!(terminal, UploadEvent::Failed { .. }));
    assert_eq!(objects.object_count(), 0);
}

/// Object store whose uploads never finish, for exercising cancellation.
struct StalledObjectStore;

#[async_trait]
impl ObjectStore for StalledObjectStore {
    async fn put(
        &self,
        _key: &str,
        _data: Vec<u8>,
        _content_type: &str,
        _progress: &ProgressSender,
    ) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn download_url(&self, _key: &str) -> Result<String, StoreError> {
        unreachable!("stalled uploads never resolve a URL")
    }
}

#[tokio::test]
async fn abort_cancels_the_transfer_without_a_terminal_event() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let facade = DataFacade::new(documents, Arc::new(StalledObjectStore));

    let handle = facade
        .initiate_upload(Uuid::new_v4(), UploadFile::new("avatar.png", vec![0u8; 64]))
        .unwrap();
    handle.abort();

    assert!(handle.wait().await.is_none());
}
