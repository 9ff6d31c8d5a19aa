use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::warn;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object not found")]
    NotFound,
    #[error("invalid object path '{0}'")]
    InvalidPath(String),
    #[error("empty upload")]
    EmptyBody,
    #[error("unsupported content type '{0}', only images are accepted")]
    UnsupportedContentType(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

impl From<BlobError> for Error {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::NotFound => Error::NotFound,
            other => Error::Upload(other.to_string()),
        }
    }
}

/// What the store knows about an object after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub object_name: String,
    pub url: String,
    pub size_bytes: i64,
    pub sha256: String,
}

/// Bucketed blob store on the local filesystem. Objects live at
/// `<storage_dir>/<bucket>/<object_name>` and are served publicly under
/// `<public_base_url>/storage/<bucket>/<object_name>`.
pub struct PhotoStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl PhotoStorage {
    pub fn new(storage_dir: &Path, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: storage_dir.to_path_buf(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, bucket: &str, object_name: &str) -> Result<PathBuf, BlobError> {
        validate_segment(bucket)?;
        validate_object_name(object_name)?;
        Ok(self.base_path.join(bucket).join(object_name))
    }

    fn temp_path(&self, bucket: &str) -> PathBuf {
        self.base_path
            .join(bucket)
            .join(".tmp")
            .join(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn public_url(&self, bucket: &str, object_name: &str) -> String {
        let encoded = object_name
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/storage/{bucket}/{encoded}", self.public_base_url)
    }

    pub async fn upload(
        &self,
        bucket: &str,
        object_name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<StoredBlob, BlobError> {
        let final_path = self.object_path(bucket, object_name)?;
        if data.is_empty() {
            return Err(BlobError::EmptyBody);
        }
        if !content_type.starts_with("image/") {
            return Err(BlobError::UnsupportedContentType(content_type.to_string()));
        }

        let mut hasher = Sha256::new();
        hasher.update(data);
        let sha256 = hex::encode(hasher.finalize());

        let temp_path = self.temp_path(bucket);
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = write_then_rename(&temp_path, &final_path, data).await {
            match fs::remove_file(&temp_path).await {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                Err(cleanup) => warn!("Failed to remove {}: {cleanup}", temp_path.display()),
            }
            return Err(e.into());
        }

        Ok(StoredBlob {
            object_name: object_name.to_string(),
            url: self.public_url(bucket, object_name),
            size_bytes: data.len() as i64,
            sha256,
        })
    }

    pub async fn get(
        &self,
        bucket: &str,
        object_name: &str,
    ) -> Result<(BufReader<File>, i64), BlobError> {
        let path = self.object_path(bucket, object_name)?;
        let file = File::open(&path).await.map_err(BlobError::from_io)?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(BlobError::NotFound);
        }

        Ok((BufReader::new(file), metadata.len() as i64))
    }

    /// Returns whether an object was removed.
    pub async fn remove(&self, bucket: &str, object_name: &str) -> Result<bool, BlobError> {
        let path = self.object_path(bucket, object_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}

async fn write_then_rename(temp_path: &Path, final_path: &Path, data: &[u8]) -> io::Result<()> {
    let mut temp_file = File::create(temp_path).await?;
    temp_file.write_all(data).await?;
    temp_file.sync_all().await?;
    drop(temp_file);

    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::rename(temp_path, final_path).await
}

/// Content type to serve an object with, from its extension.
#[must_use]
pub fn content_type_for(object_name: &str) -> &'static str {
    let ext = object_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// File extension for an uploaded image's content type.
#[must_use]
pub fn extension_for(content_type: &str) -> &str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        other => other
            .strip_prefix("image/")
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("jpg"),
    }
}

fn validate_segment(segment: &str) -> Result<(), BlobError> {
    let valid = !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidPath(segment.to_string()))
    }
}

fn validate_object_name(object_name: &str) -> Result<(), BlobError> {
    let path = Path::new(object_name);
    let normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if object_name.is_empty() || !normal {
        return Err(BlobError::InvalidPath(object_name.to_string()));
    }
    object_name.split('/').try_for_each(validate_segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    const BUCKET: &str = "incident-photos";

    fn storage(dir: &TempDir) -> PhotoStorage {
        PhotoStorage::new(dir.path(), "http://localhost:8080/")
    }

    #[tokio::test]
    async fn test_upload_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        let stored = storage
            .upload(BUCKET, "inc-1/0_1700000000000.jpg", b"123", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(
            stored.url,
            "http://localhost:8080/storage/incident-photos/inc-1/0_1700000000000.jpg"
        );
        assert_eq!(stored.size_bytes, 3);
        assert_eq!(
            stored.sha256,
            "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3"
        );

        let (mut reader, size) = storage
            .get(BUCKET, "inc-1/0_1700000000000.jpg")
            .await
            .unwrap();
        assert_eq!(size, 3);
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"123");
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        // A directory squatting on the object path makes the final rename fail.
        let object = "inc-1/0_1700000000000.jpg";
        std::fs::create_dir_all(temp_dir.path().join(BUCKET).join(object).join("x")).unwrap();

        let result = storage.upload(BUCKET, object, b"123", "image/jpeg").await;
        assert!(matches!(result, Err(BlobError::Io(_))));

        let leftovers = std::fs::read_dir(temp_dir.path().join(BUCKET).join(".tmp"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_non_image() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        assert!(matches!(
            storage.upload(BUCKET, "a/0_1.jpg", b"", "image/jpeg").await,
            Err(BlobError::EmptyBody)
        ));
        assert!(matches!(
            storage.upload(BUCKET, "a/0_1.txt", b"hi", "text/plain").await,
            Err(BlobError::UnsupportedContentType(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        for name in ["../escape.jpg", "/abs.jpg", "a//b.jpg", "a/./b.jpg", ""] {
            assert!(
                matches!(
                    storage.upload(BUCKET, name, b"1", "image/png").await,
                    Err(BlobError::InvalidPath(_))
                ),
                "{name}"
            );
        }
        assert!(matches!(
            storage.get("../etc", "passwd").await,
            Err(BlobError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        storage
            .upload(BUCKET, "inc/1_2.png", b"png", "image/png")
            .await
            .unwrap();
        assert!(storage.remove(BUCKET, "inc/1_2.png").await.unwrap());
        assert!(!storage.remove(BUCKET, "inc/1_2.png").await.unwrap());
        assert!(matches!(
            storage.get(BUCKET, "inc/1_2.png").await,
            Err(BlobError::NotFound)
        ));
    }

    #[test]
    fn test_content_types_and_extensions() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/"), "jpg");
        assert_eq!(content_type_for("x/0_1.JPG"), "image/jpeg");
        assert_eq!(content_type_for("x/0_1.webp"), "image/webp");
        assert_eq!(content_type_for("x/noext"), "application/octet-stream");
    }
}
