use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::ImageStore;

/// Filesystem-backed content-addressed image store.
///
/// Images are stored in a Git-style sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}`
pub struct FilesystemImageStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemImageStore {
    /// Create a new filesystem image store rooted at `base_path`.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Compute the filesystem path for a given content hash.
    fn image_path(&self, hash: &ContentHash) -> PathBuf {
        self.base_path
            .join(hash.shard_prefix())
            .join(hash.shard_suffix())
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let hash = ContentHash::compute(data);
        let image_path = self.image_path(&hash);

        if image_path.exists() {
            return Ok(hash);
        }

        // Write to a temp file first, then rename into place, so a crashed
        // write never leaves a half-written image under its final hash.
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = image_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &image_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let image_path = self.image_path(hash);
        match fs::read(&image_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        Ok(fs::try_exists(&self.image_path(hash)).await?)
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(&self.image_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
