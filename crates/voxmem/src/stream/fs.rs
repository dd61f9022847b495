//! Filesystem-backed stream factory.

use super::{StorageKey, StreamFactory};
use std::fs::{File, OpenOptions};
use std::hash::{DefaultHasher, Hasher};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Stream factory that stores each key as one file in a directory.
///
/// Keys are sanitized into file names, so any key accepted elsewhere in
/// the crate is usable here.
#[derive(Debug, Clone)]
pub struct FileStreamFactory {
    dir: PathBuf,
}

impl FileStreamFactory {
    /// Creates a factory rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory holding the dumped files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// Keys that survive sanitization unchanged map to `<key>.dump`;
    /// anything else gets a hash of the raw key appended so that distinct
    /// keys never share a file.
    #[must_use]
    pub fn path(&self, key: &StorageKey) -> PathBuf {
        let mut name: String = key
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if name != key.as_str() {
            let mut hasher = DefaultHasher::new();
            hasher.write(key.as_str().as_bytes());
            name.push_str(&format!("-{:016x}", hasher.finish()));
        }
        self.dir.join(format!("{name}.dump"))
    }
}

impl StreamFactory for FileStreamFactory {
    fn reader(&self, key: &StorageKey) -> std::io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.path(key))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn writer(&self, key: &StorageKey) -> std::io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path(key))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
