//! File-backed stores shared across tasks and reopened from disk

use std::sync::Arc;
use taskboard_store::{
    BlobStore, FileBlobStore, FileScalarStore, MemoryBlobStore, Retention, ScalarStore, StoreError,
};
use tempfile::TempDir;

#[test_log::test(tokio::test)]
async fn test_scalar_entries_survive_reopen() {
    let temp = TempDir::new().unwrap();

    {
        let store = FileScalarStore::open(temp.path()).await.unwrap();
        store.set("tasks:01HZX", r#"[{"id":"a"}]"#).await.unwrap();
        store.set("current_board", "01HZX").await.unwrap();
    }

    let store = FileScalarStore::open(temp.path()).await.unwrap();
    assert_eq!(
        store.get("tasks:01HZX").await.unwrap().as_deref(),
        Some(r#"[{"id":"a"}]"#)
    );
    assert_eq!(
        store.keys().await.unwrap(),
        vec!["current_board", "tasks:01HZX"]
    );
}

#[test_log::test(tokio::test)]
async fn test_rewrite_refreshes_retention() {
    let temp = TempDir::new().unwrap();
    let expiring = FileScalarStore::open(temp.path())
        .await
        .unwrap()
        .with_retention(Retention::days(0));
    expiring.set("boards", "[]").await.unwrap();

    // Same directory, normal retention: the rewrite starts a fresh window.
    let store = FileScalarStore::open(temp.path()).await.unwrap();
    assert_eq!(store.get("boards").await.unwrap(), None);
    store.set("boards", "[]").await.unwrap();
    assert_eq!(store.get("boards").await.unwrap().as_deref(), Some("[]"));
}

#[test_log::test(tokio::test)]
async fn test_concurrent_blob_writes() {
    let temp = TempDir::new().unwrap();
    let store: Arc<dyn BlobStore> = Arc::new(FileBlobStore::open(temp.path()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.put(&format!("task-{i:02}"), &[i; 32]).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let keys = store.keys().await.unwrap();
    assert_eq!(keys.len(), 16);
    assert_eq!(keys[0], "task-00");
    assert_eq!(store.get("task-07").await.unwrap(), Some(vec![7; 32]));
}

#[test_log::test(tokio::test)]
async fn test_memory_and_file_blob_stores_agree() {
    let temp = TempDir::new().unwrap();
    let stores: Vec<Box<dyn BlobStore>> = vec![
        Box::new(MemoryBlobStore::new()),
        Box::new(FileBlobStore::open(temp.path()).await.unwrap()),
    ];

    for store in &stores {
        store.put("z", b"last").await.unwrap();
        store.put("a", b"first").await.unwrap();
        store.delete("missing").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["a", "z"]);
    }
}

#[test_log::test(tokio::test)]
async fn test_size_limit_reported_per_key() {
    let temp = TempDir::new().unwrap();
    let store = FileScalarStore::open(temp.path())
        .await
        .unwrap()
        .with_max_value_bytes(8);

    match store.set("templates", "0123456789").await {
        Err(StoreError::QuotaExceeded { key, size, limit }) => {
            assert_eq!(key, "templates");
            assert_eq!(size, 10);
            assert_eq!(limit, 8);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
}
