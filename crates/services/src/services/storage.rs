//! Object storage gateway for uploaded media.
//!
//! The marketing site keeps uploaded images in per-section buckets. The
//! [`ObjectStore`] trait is the seam between the editing logic and the
//! actual storage backend; [`LocalObjectStore`] is the filesystem-backed
//! implementation served back to browsers via a static route.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Hard cap for a single uploaded file.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object name `{0}`")]
    InvalidObjectName(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Why a selected file was rejected before any storage call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("unsupported file type `{0}`")]
    UnsupportedType(String),
    #[error("file larger than {MAX_UPLOAD_BYTES} bytes")]
    TooLarge,
}

/// A file the user picked in a form, not yet persisted anywhere.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Check a selected file against the section's constraints. Violations are
/// field-level errors; nothing is sent over the network for a bad file.
pub fn validate_upload(file: &SelectedFile, allowed: &[&str]) -> Result<(), UploadRejection> {
    if !allowed.contains(&file.content_type.as_str()) {
        return Err(UploadRejection::UnsupportedType(file.content_type.clone()));
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge);
    }
    Ok(())
}

/// Generate a collision-resistant object name keeping the original
/// extension: millisecond timestamp plus a random alphanumeric suffix.
pub fn unique_object_name(original_file_name: &str) -> String {
    let stamp = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    match std::path::Path::new(original_file_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("{stamp}-{suffix}.{}", ext.to_ascii_lowercase()),
        None => format!("{stamp}-{suffix}"),
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `bucket/name`, overwriting any existing object.
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Remove the named objects. Missing objects are not an error.
    async fn remove(&self, bucket: &str, names: &[String]) -> Result<(), StorageError>;

    /// Publicly reachable URL for a stored object.
    fn public_url(&self, bucket: &str, name: &str) -> String;
}

/// Filesystem-backed store under a configured root directory.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, StorageError> {
        validate_component(bucket)?;
        validate_component(name)?;
        Ok(self.root.join(bucket).join(name))
    }
}

/// Bucket and object names are single path components; anything that could
/// escape the storage root is rejected.
fn validate_component(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(StorageError::InvalidObjectName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(bucket, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(bucket, name, size = bytes.len(), "stored object");
        Ok(())
    }

    async fn remove(&self, bucket: &str, names: &[String]) -> Result<(), StorageError> {
        for name in names {
            let path = self.object_path(bucket, name)?;
            match fs::remove_file(&path).await {
                Ok(()) => debug!(bucket, name = name.as_str(), "removed object"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/{bucket}/{name}",
            self.public_base.trim_end_matches('/')
        )
    }
}
