//! Scalar store: key → text with a refreshed retention window

use crate::error::{Result, StoreError};
use crate::fs::{atomic_write, entry_path, list_keys, open_dir, read_optional, remove_optional};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

const SCALAR_EXTENSION: &str = "json";

/// How long a scalar entry lives after its most recent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention(Duration);

impl Retention {
    /// Default retention window
    pub const DEFAULT_DAYS: u32 = 365;

    /// A window of `days` whole days; `u32` days always fit in a `Duration`
    pub fn days(days: u32) -> Self {
        Self(Duration::seconds(i64::from(days) * 86_400))
    }

    /// Like [`Retention::days`] for an untrusted count
    ///
    /// `None` when `days` is negative or too large to represent.
    pub fn try_days(days: i64) -> Option<Self> {
        if days < 0 {
            return None;
        }
        Duration::try_days(days).map(Self)
    }

    pub fn new(window: Duration) -> Self {
        Self(window)
    }

    pub fn window(&self) -> Duration {
        self.0
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.0)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self::days(Self::DEFAULT_DAYS)
    }
}

/// Storage abstraction for small text values that expire
///
/// Every `set` restarts the entry's retention window. An entry whose window
/// has elapsed reads as absent and is dropped on the next access.
#[async_trait]
pub trait ScalarStore: Send + Sync {
    /// Store `value` under `name`
    async fn set(&self, name: &str, value: &str) -> Result<()>;

    /// Fetch the live value stored under `name`
    async fn get(&self, name: &str) -> Result<Option<String>>;

    /// Remove `name`. Returns whether a live value was present.
    async fn remove(&self, name: &str) -> Result<bool>;

    /// Names of all live entries, sorted
    async fn keys(&self) -> Result<Vec<String>>;
}

/// On-disk and in-memory entry shape
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Envelope {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

fn check_size(name: &str, value: &str, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(limit) if value.len() > limit => Err(StoreError::QuotaExceeded {
            key: name.to_string(),
            size: value.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// In-memory scalar store
#[derive(Debug, Default)]
pub struct MemoryScalarStore {
    entries: RwLock<BTreeMap<String, Envelope>>,
    retention: Retention,
    max_value_bytes: Option<usize>,
}

impl MemoryScalarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Reject values larger than `limit` bytes
    pub fn with_max_value_bytes(mut self, limit: usize) -> Self {
        self.max_value_bytes = Some(limit);
        self
    }
}

#[async_trait]
impl ScalarStore for MemoryScalarStore {
    async fn set(&self, name: &str, value: &str) -> Result<()> {
        check_size(name, value, self.max_value_bytes)?;
        trace!(name, size = value.len(), "scalar set");
        let envelope = Envelope {
            value: value.to_string(),
            expires_at: self.retention.expiry_from(Utc::now()),
        };
        self.entries
            .write()
            .await
            .insert(name.to_string(), envelope);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(name) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        debug!(name, "scalar entry expired");
        self.entries.write().await.remove(name);
        Ok(None)
    }

    async fn remove(&self, name: &str) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .entries
            .write()
            .await
            .remove(name)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries.keys().cloned().collect())
    }
}

/// File-backed scalar store: one `{name}.json` envelope per entry
#[derive(Debug)]
pub struct FileScalarStore {
    dir: PathBuf,
    retention: Retention,
    max_value_bytes: Option<usize>,
}

impl FileScalarStore {
    /// Open (creating if needed) a scalar store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        open_dir(&dir).await?;
        debug!(dir = %dir.display(), "opened scalar store");
        Ok(Self {
            dir,
            retention: Retention::default(),
            max_value_bytes: None,
        })
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Reject values larger than `limit` bytes
    pub fn with_max_value_bytes(mut self, limit: usize) -> Self {
        self.max_value_bytes = Some(limit);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        entry_path(&self.dir, name, SCALAR_EXTENSION)
    }

    async fn read_envelope(&self, name: &str) -> Result<Option<Envelope>> {
        let Some(bytes) = read_optional(&self.path(name)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::corrupt(name, e.to_string()))
    }
}

#[async_trait]
impl ScalarStore for FileScalarStore {
    async fn set(&self, name: &str, value: &str) -> Result<()> {
        check_size(name, value, self.max_value_bytes)?;
        trace!(name, size = value.len(), "scalar set");
        let envelope = Envelope {
            value: value.to_string(),
            expires_at: self.retention.expiry_from(Utc::now()),
        };
        let bytes = serde_json::to_vec(&envelope)?;
        atomic_write(&self.path(name), &bytes).await
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        match self.read_envelope(name).await? {
            Some(entry) if entry.is_live(Utc::now()) => Ok(Some(entry.value)),
            Some(_) => {
                debug!(name, "scalar entry expired");
                remove_optional(&self.path(name)).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, name: &str) -> Result<bool> {
        let live = match self.read_envelope(name).await {
            Ok(entry) => entry.is_some_and(|e| e.is_live(Utc::now())),
            Err(e) => {
                warn!(name, error = %e, "removing unreadable scalar entry");
                false
            }
        };
        let existed = remove_optional(&self.path(name)).await?;
        Ok(existed && live)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let now = Utc::now();
        let mut live = Vec::new();
        for name in list_keys(&self.dir, SCALAR_EXTENSION).await? {
            match self.read_envelope(&name).await {
                Ok(Some(entry)) if entry.is_live(now) => live.push(name),
                Ok(_) => {}
                Err(e) => warn!(name = %name, error = %e, "skipping unreadable scalar entry"),
            }
        }
        Ok(live)
    }
}
