//! In-memory stream factory.

use super::{StorageKey, StreamFactory};
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

/// Stream factory holding every byte sequence in process memory.
///
/// Useful for tests and for embedding the manager where no durable
/// backing is wanted. Clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStreamFactory {
    slots: Arc<Mutex<HashMap<StorageKey, Bytes>>>,
}

impl MemoryStreamFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &StorageKey) -> Option<Bytes> {
        self.slots.lock().get(key).cloned()
    }

    /// Stores `bytes` under `key`, replacing any previous content.
    pub fn insert(&self, key: StorageKey, bytes: impl Into<Bytes>) {
        self.slots.lock().insert(key, bytes.into());
    }

    /// Deletes the content stored under `key`.
    pub fn remove(&self, key: &StorageKey) -> Option<Bytes> {
        self.slots.lock().remove(key)
    }
}

impl StreamFactory for MemoryStreamFactory {
    fn reader(&self, key: &StorageKey) -> std::io::Result<Box<dyn Read + Send>> {
        let bytes = self.get(key).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no content stored under `{key}`"),
            )
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn writer(&self, key: &StorageKey) -> std::io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(SlotWriter {
            key: key.clone(),
            buffer: Vec::new(),
            slots: Arc::clone(&self.slots),
        }))
    }
}

/// Buffers written bytes and commits them to the shared map on flush.
struct SlotWriter {
    key: StorageKey,
    buffer: Vec<u8>,
    slots: Arc<Mutex<HashMap<StorageKey, Bytes>>>,
}

impl SlotWriter {
    fn commit(&mut self) {
        let bytes = Bytes::from(std::mem::take(&mut self.buffer));
        self.slots.lock().insert(self.key.clone(), bytes);
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            self.commit();
        }
    }
}

impl Write for SlotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.commit();
        Ok(())
    }
}
