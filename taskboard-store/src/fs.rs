//! File helpers shared by the file-backed stores

use crate::error::{Result, StoreError};
use crate::key::{key_from_filename, key_to_filename};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Create the store directory, mapping failure to [`StoreError::Unavailable`]
pub(crate) async fn open_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| StoreError::Unavailable {
            path: dir.to_path_buf(),
            source,
        })
}

/// Path of the file holding `key` inside `dir`
pub(crate) fn entry_path(dir: &Path, key: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", key_to_filename(key), extension))
}

/// Atomic write via temp file and rename
pub(crate) async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}

/// Read a file, returning `None` when it does not exist
pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file; a missing file is not an error
pub(crate) async fn remove_optional(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// List the keys of every `*.{extension}` file in `dir`
pub(crate) async fn list_keys(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some(extension) {
            continue;
        }
        if let Some(key) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(key_from_filename)
        {
            keys.push(key);
        }
    }

    keys.sort();
    Ok(keys)
}
