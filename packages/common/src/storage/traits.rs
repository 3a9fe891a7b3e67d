use async_trait::async_trait;

use super::error::StorageError;
use super::hash::ContentHash;

/// Content-addressed image storage.
///
/// Recipe images are stored by the SHA-256 hash of their bytes, so identical
/// uploads deduplicate naturally and entities only carry the hex hash.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store image bytes and return their content hash.
    async fn put(&self, data: &[u8]) -> Result<ContentHash, StorageError>;

    /// Retrieve the bytes of a stored image.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError>;

    /// Check whether an image exists.
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Delete an image by its content hash.
    ///
    /// Returns `true` if the image was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;
}
