//! Byte-stream backings used for dump and restore.
//!
//! A [`StreamFactory`] supplies readable and writable byte streams for a
//! [`StorageKey`]. The manager writes a buffer's bytes through the writer
//! when dumping and reads them back through the reader when restoring;
//! the same mechanism materializes lazily loaded buffers on first lock.

mod fs;
mod memory;

pub use fs::FileStreamFactory;
pub use memory::MemoryStreamFactory;

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// Identifies one stored byte sequence within a stream factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(Arc<str>);

impl StorageKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StorageKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for StorageKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplier of read/write byte streams keyed by storage identifier.
///
/// The concrete backing (local filesystem, object store, in-memory map)
/// is an external collaborator; the manager only needs these two
/// operations and their failure reporting.
pub trait StreamFactory: Send + Sync {
    /// Opens a readable stream over the bytes stored under `key`.
    fn reader(&self, key: &StorageKey) -> std::io::Result<Box<dyn Read + Send>>;

    /// Opens a writable sink for `key`, replacing any previous content.
    ///
    /// The content is committed when the sink is flushed and dropped.
    fn writer(&self, key: &StorageKey) -> std::io::Result<Box<dyn Write + Send>>;
}
