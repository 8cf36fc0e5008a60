//! Session configuration
//!
//! Layered with figment, later layers overriding earlier ones:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `TASKBOARD_`-prefixed environment variables (`TASKBOARD_BACKEND=memory`)

use crate::error::{BoardError, Result};
use crate::task::{DateRange, SortMode};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taskboard_store::Retention;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "TASKBOARD_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Nothing outlives the process
    Memory,
    /// One file per key under `data_dir`
    #[default]
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub data_dir: PathBuf,
    pub backend: Backend,
    /// Scalar entries expire this long after their last write
    pub retention_days: i64,
    /// Per-value size limit for the scalar store
    pub max_scalar_bytes: Option<usize>,
    pub default_sort: SortMode,
    pub default_date_range: DateRange,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".taskboard"),
            backend: Backend::File,
            retention_days: 365,
            max_scalar_bytes: None,
            default_sort: SortMode::default(),
            default_date_range: DateRange::default(),
        }
    }
}

impl BoardConfig {
    /// Defaults for a throwaway in-memory session
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            ..Self::default()
        }
    }

    /// Defaults for a file-backed session rooted at `data_dir`
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// The figment the configuration is extracted from
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.retention()?;
        debug!(backend = ?config.backend, data_dir = %config.data_dir.display(), "loaded configuration");
        Ok(config)
    }

    /// The scalar retention window; at least one day
    pub fn retention(&self) -> Result<Retention> {
        if self.retention_days < 1 {
            return Err(BoardError::invalid_value(
                "retention_days",
                format!("must be at least 1, got {}", self.retention_days),
            ));
        }
        Retention::try_days(self.retention_days).ok_or_else(|| {
            BoardError::invalid_value(
                "retention_days",
                format!("{} days is out of range", self.retention_days),
            )
        })
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    pub fn scalar_dir(&self) -> PathBuf {
        self.data_dir.join("scalars")
    }
}
