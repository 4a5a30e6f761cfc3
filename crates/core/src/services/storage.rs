//! Image storage for category banners and nominee pictures.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use awards_common::{AppError, AppResult, config::StorageConfig};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

/// Storage backend trait for file operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save file data under a storage key.
    async fn save(&self, key: &str, data: &[u8]) -> AppResult<()>;

    /// Delete a file from storage.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Get the public URL for a file.
    fn get_url(&self, key: &str) -> String;

    /// Recover the storage key from a URL produced by [`Self::get_url`].
    fn key_from_url(&self, url: &str) -> Option<String>;
}

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    /// Base directory for storing files.
    base_path: PathBuf,
    /// Base URL for accessing files.
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the full path for a storage key.
    fn get_path(&self, key: &str) -> AppResult<PathBuf> {
        if !is_safe_key(key) {
            return Err(AppError::BadRequest(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn save(&self, key: &str, data: &[u8]) -> AppResult<()> {
        let path = self.get_path(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.get_path(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.get_path(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    fn get_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        strip_base(&self.base_url, url)
    }
}

/// No-op storage backend for testing or when file storage is disabled.
#[derive(Clone, Default)]
pub struct NoOpStorage {
    base_url: String,
}

impl NoOpStorage {
    /// Create a new no-op storage backend.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageBackend for NoOpStorage {
    async fn save(&self, _key: &str, _data: &[u8]) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Ok(false)
    }

    fn get_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        strip_base(&self.base_url, url)
    }
}

/// Type alias for the storage service.
pub type StorageService = std::sync::Arc<dyn StorageBackend>;

fn strip_base(base_url: &str, url: &str) -> Option<String> {
    let key = url.strip_prefix(base_url)?.strip_prefix('/')?;
    is_safe_key(key).then(|| key.to_string())
}

/// Relative path made only of normal components.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Folder an uploaded image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFolder {
    Categories,
    Nominees,
}

impl ImageFolder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Nominees => "nominees",
        }
    }
}

impl fmt::Display for ImageFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFolder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "categories" => Ok(Self::Categories),
            "nominees" => Ok(Self::Nominees),
            other => Err(AppError::BadRequest(format!("Unknown image folder: {other}"))),
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
}

/// Validating front of a [`StorageBackend`] for images.
#[derive(Clone)]
pub struct ImageService {
    storage: StorageService,
    max_bytes: usize,
}

impl ImageService {
    /// Create a new image service.
    #[must_use]
    pub fn new(storage: StorageService, config: &StorageConfig) -> Self {
        Self {
            storage,
            max_bytes: config.max_image_bytes,
        }
    }

    /// Validate and store an image, returning its public URL.
    pub async fn upload(
        &self,
        folder: ImageFolder,
        content_type: &str,
        data: &[u8],
    ) -> AppResult<StoredImage> {
        let extension = extension_for(content_type).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unsupported image type {content_type}; use JPEG, PNG or WebP"
            ))
        })?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Image is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "Image is larger than {} bytes",
                self.max_bytes
            )));
        }
        if sniff_extension(data) != Some(extension) {
            return Err(AppError::BadRequest(
                "Image content does not match its declared type".to_string(),
            ));
        }

        let key = generate_key(folder, extension);
        self.storage.save(&key, data).await?;

        tracing::info!(key = %key, size = data.len(), "Image stored");

        Ok(StoredImage {
            url: self.storage.get_url(&key),
            key,
        })
    }

    /// Delete an image by its public URL.
    ///
    /// URLs that do not belong to this storage are ignored.
    pub async fn delete_by_url(&self, url: &str) -> AppResult<()> {
        match self.storage.key_from_url(url) {
            Some(key) => self.storage.delete(&key).await,
            None => {
                tracing::debug!(url = %url, "Not a stored image URL, skipping delete");
                Ok(())
            }
        }
    }

    /// Delete an image, logging and ignoring failures.
    pub async fn remove_best_effort(&self, url: Option<&str>) {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return;
        };

        if let Err(e) = self.delete_by_url(url).await {
            tracing::warn!(url = %url, error = %e, "Failed to delete image, ignoring");
        }
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// File extension implied by the magic bytes.
fn sniff_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// `folder/<unix millis>-<random>.<ext>`
fn generate_key(folder: ImageFolder, extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!(
        "{folder}/{}-{suffix}.{extension}",
        Utc::now().timestamp_millis()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn service(storage: StorageService, max_bytes: usize) -> ImageService {
        ImageService::new(
            storage,
            &StorageConfig {
                max_image_bytes: max_bytes,
                ..StorageConfig::default()
            },
        )
    }

    #[test]
    fn test_generate_key() {
        let key = generate_key(ImageFolder::Nominees, "png");
        assert!(key.starts_with("nominees/"));
        assert!(key.ends_with(".png"));
        assert!(key.contains('-'));
    }

    #[test]
    fn test_key_from_url_rejects_traversal() {
        let storage = NoOpStorage::new("/files/".to_string());
        assert_eq!(
            storage.key_from_url("/files/nominees/1-abc.png"),
            Some("nominees/1-abc.png".to_string())
        );
        assert_eq!(storage.key_from_url("/files/../etc/passwd"), None);
        assert_eq!(storage.key_from_url("https://elsewhere/x.png"), None);
    }

    #[test]
    fn test_sniff_extension() {
        assert_eq!(sniff_extension(PNG), Some("png"));
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpg"));
        assert_eq!(sniff_extension(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(sniff_extension(b"GIF89a"), None);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let images = service(Arc::new(NoOpStorage::new("/files".to_string())), 1024);
        let result = images
            .upload(ImageFolder::Nominees, "image/gif", b"GIF89a")
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized() {
        let images = service(Arc::new(NoOpStorage::new("/files".to_string())), 8);
        let result = images
            .upload(ImageFolder::Categories, "image/png", PNG)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_upload_and_delete_local() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(
            dir.path().to_path_buf(),
            "/files".to_string(),
        ));
        let images = service(storage.clone(), 1024);

        let stored = images
            .upload(ImageFolder::Categories, "image/png", PNG)
            .await
            .unwrap();
        assert!(stored.url.starts_with("/files/categories/"));
        assert!(storage.exists(&stored.key).await.unwrap());

        images.delete_by_url(&stored.url).await.unwrap();
        assert!(!storage.exists(&stored.key).await.unwrap());

        // Second delete is a no-op
        images.remove_best_effort(Some(&stored.url)).await;
    }
}
