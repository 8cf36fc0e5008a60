//! Key-value storage backends for the task board
//!
//! Two stores with complementary strengths back every board:
//!
//! - **[`BlobStore`]** - durable key → bytes, no expiry, no size limit. Holds
//!   large binary payloads (task attachments) keyed by task id.
//! - **[`ScalarStore`]** - durable key → text with a retention window that is
//!   refreshed on every write, optionally size-limited per value. Holds the
//!   quickly enumerable JSON documents (board list, per-board task lists,
//!   templates, recurrence rules).
//!
//! Each trait has an in-memory implementation for tests and ephemeral
//! sessions, and a file-backed implementation that writes one file per key
//! with an atomic temp-file-and-rename.
//!
//! ```rust
//! use taskboard_store::{BlobStore, MemoryBlobStore, MemoryScalarStore, ScalarStore};
//!
//! # async fn example() -> taskboard_store::Result<()> {
//! let blobs = MemoryBlobStore::new();
//! blobs.put("task-1", b"raw bytes").await?;
//! assert_eq!(blobs.get("task-1").await?, Some(b"raw bytes".to_vec()));
//!
//! let scalars = MemoryScalarStore::new();
//! scalars.set("boards", "[]").await?;
//! assert_eq!(scalars.get("boards").await?.as_deref(), Some("[]"));
//! # Ok(())
//! # }
//! ```

mod blob;
mod error;
mod fs;
mod key;
mod scalar;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use error::{Result, StoreError};
pub use key::{key_from_filename, key_to_filename};
pub use scalar::{FileScalarStore, MemoryScalarStore, Retention, ScalarStore};
