//! Persistence of the two image slots
//!
//! The service keeps exactly two images: the last uploaded original and the
//! last pipeline output. Writes replace a slot wholesale; reads return the
//! complete bytes of the last successful write.

use crate::{
    error::{RetouchError, Result},
    types::ImageSlot,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for the `original` and `processed` slots
///
/// Implementations guarantee that a concurrent `get` observes either the
/// previous or the new content of a slot, never a partial write.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Replace the content of `slot`
    async fn put(&self, slot: ImageSlot, bytes: Vec<u8>) -> Result<()>;

    /// Read the content of `slot`
    ///
    /// # Errors
    /// `RetouchError::NotFound` if the slot was never written.
    async fn get(&self, slot: ImageSlot) -> Result<Vec<u8>>;
}

fn slot_missing(slot: ImageSlot) -> RetouchError {
    RetouchError::not_found(format!("{slot} has not been uploaded yet"))
}

/// Filesystem store writing `<dir>/original_image.jpg` and `<dir>/processed_image.jpg`
///
/// Each slot has its own lock. A write goes to a temporary file in the same
/// directory which is then renamed over the slot file.
pub struct FsImageStore {
    dir: PathBuf,
    original: RwLock<()>,
    processed: RwLock<()>,
}

impl FsImageStore {
    /// Open the store, creating the directory if it does not exist
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| RetouchError::file_io_error("create upload directory", &dir, &e))?;

        debug!(dir = %dir.display(), "opened image store");

        Ok(Self {
            dir,
            original: RwLock::new(()),
            processed: RwLock::new(()),
        })
    }

    /// Directory holding the slot files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `slot`
    #[must_use]
    pub fn slot_path(&self, slot: ImageSlot) -> PathBuf {
        self.dir.join(slot.file_name())
    }

    fn lock(&self, slot: ImageSlot) -> &RwLock<()> {
        match slot {
            ImageSlot::Original => &self.original,
            ImageSlot::Processed => &self.processed,
        }
    }
}

fn replace_file(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| RetouchError::file_io_error("create temporary file in", dir, &e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| RetouchError::file_io_error("write temporary file for", path, &e))?;
    tmp.persist(path)
        .map_err(|e| RetouchError::file_io_error("replace", path, &e.error))?;
    Ok(())
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(&self, slot: ImageSlot, bytes: Vec<u8>) -> Result<()> {
        let _guard = self.lock(slot).write().await;
        let dir = self.dir.clone();
        let path = self.slot_path(slot);
        let size = bytes.len();

        tokio::task::spawn_blocking(move || replace_file(&dir, &path, &bytes)).await??;

        debug!(%slot, size, "slot written");
        Ok(())
    }

    async fn get(&self, slot: ImageSlot) -> Result<Vec<u8>> {
        let _guard = self.lock(slot).read().await;
        let path = self.slot_path(slot);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(slot_missing(slot)),
            Err(e) => Err(RetouchError::file_io_error("read", &path, &e)),
        }
    }
}

/// In-memory store, used in tests and for throwaway servers
#[derive(Default)]
pub struct MemoryImageStore {
    slots: RwLock<HashMap<ImageSlot, Vec<u8>>>,
}

impl MemoryImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn put(&self, slot: ImageSlot, bytes: Vec<u8>) -> Result<()> {
        self.slots.write().await.insert(slot, bytes);
        Ok(())
    }

    async fn get(&self, slot: ImageSlot) -> Result<Vec<u8>> {
        self.slots
            .read()
            .await
            .get(&slot)
            .cloned()
            .ok_or_else(|| slot_missing(slot))
    }
}
