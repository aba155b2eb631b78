//! Object storage for uploaded files (item images, approval proofs, field
//! photos, avatars).
//!
//! Objects are addressed by bucket and a relative, slash-separated path. The
//! public URL of an object is `/storage/<bucket>/<path>`, which the API serves
//! without authentication.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    ItemImages,
    ApprovalProofs,
    FieldPhotos,
    Avatars,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::ItemImages,
        Bucket::ApprovalProofs,
        Bucket::FieldPhotos,
        Bucket::Avatars,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::ItemImages => "item-images",
            Bucket::ApprovalProofs => "approval-proofs",
            Bucket::FieldPhotos => "field-photos",
            Bucket::Avatars => "avatars",
        }
    }
}

impl core::fmt::Display for Bucket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| BlobError::UnknownBucket(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("unknown bucket '{0}'")]
    UnknownBucket(String),

    #[error("invalid object path '{0}'")]
    InvalidPath(String),

    #[error("object {bucket}/{path} not found")]
    NotFound { bucket: Bucket, path: String },

    #[error("object {bucket}/{path} already exists")]
    AlreadyExists { bucket: Bucket, path: String },

    #[error("blob storage io error: {0}")]
    Io(String),
}

/// Reject empty, absolute and traversing paths. Returns the path without
/// surrounding slashes or whitespace.
pub fn validate_path(path: &str) -> Result<String, BlobError> {
    let trimmed = path.trim();
    let invalid = || BlobError::InvalidPath(path.to_string());
    if trimmed.is_empty() || trimmed.starts_with('/') || trimmed.contains('\\') {
        return Err(invalid());
    }
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

pub fn public_url(bucket: Bucket, path: &str) -> String {
    format!("/storage/{bucket}/{path}")
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes`, replacing any existing object; returns the public URL.
    async fn put(&self, bucket: Bucket, path: &str, bytes: Vec<u8>) -> Result<String, BlobError>;

    /// Store `bytes` only if nothing lives at `path` yet.
    async fn create(&self, bucket: Bucket, path: &str, bytes: Vec<u8>) -> Result<String, BlobError>;

    async fn get(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, BlobError>;
}

/// Files under `<root>/<bucket>/<path>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, bucket: Bucket, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.root.join(bucket.as_str()), |acc, seg| acc.join(seg))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bucket: Bucket, path: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        let path = validate_path(path)?;
        let target = self.locate(bucket, &path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| BlobError::Io(e.to_string()))?;
        tracing::debug!(%bucket, %path, "blob stored");
        Ok(public_url(bucket, &path))
    }

    async fn create(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let path = validate_path(path)?;
        let target = self.locate(bucket, &path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::Io(e.to_string()))?;
        }
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BlobError::AlreadyExists { bucket, path });
            }
            Err(e) => return Err(BlobError::Io(e.to_string())),
        };
        file.write_all(&bytes)
            .await
            .map_err(|e| BlobError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| BlobError::Io(e.to_string()))?;
        tracing::debug!(%bucket, %path, "blob created");
        Ok(public_url(bucket, &path))
    }

    async fn get(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, BlobError> {
        let path = validate_path(path)?;
        match tokio::fs::read(self.locate(bucket, &path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound { bucket, path })
            }
            Err(e) => Err(BlobError::Io(e.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<(Bucket, String), Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bucket: Bucket, path: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        let path = validate_path(path)?;
        let url = public_url(bucket, &path);
        self.objects.write().await.insert((bucket, path), bytes);
        Ok(url)
    }

    async fn create(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        let path = validate_path(path)?;
        let url = public_url(bucket, &path);
        let mut objects = self.objects.write().await;
        if objects.contains_key(&(bucket, path.clone())) {
            return Err(BlobError::AlreadyExists { bucket, path });
        }
        objects.insert((bucket, path), bytes);
        Ok(url)
    }

    async fn get(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, BlobError> {
        let path = validate_path(path)?;
        self.objects
            .read()
            .await
            .get(&(bucket, path.clone()))
            .cloned()
            .ok_or(BlobError::NotFound { bucket, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names_round_trip() {
        for b in Bucket::ALL {
            assert_eq!(b.as_str().parse::<Bucket>().unwrap(), b);
        }
        assert!(matches!(
            "secrets".parse::<Bucket>(),
            Err(BlobError::UnknownBucket(_))
        ));
    }

    #[test]
    fn paths_are_validated() {
        assert_eq!(validate_path(" items/pump.png ").unwrap(), "items/pump.png");
        assert_eq!(validate_path("a/b/").unwrap(), "a/b");
        for bad in ["", "   ", "/etc/passwd", "../up.png", "a/../../b", "a//b", "a\\b", "./x"] {
            assert!(validate_path(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn in_memory_put_then_get() {
        let store = InMemoryBlobStore::new();
        let url = store
            .put(Bucket::FieldPhotos, "site/1.jpg", b"jpeg".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "/storage/field-photos/site/1.jpg");
        assert_eq!(store.get(Bucket::FieldPhotos, "site/1.jpg").await.unwrap(), b"jpeg");
        assert!(matches!(
            store.get(Bucket::Avatars, "site/1.jpg").await,
            Err(BlobError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_never_replaces_an_object() {
        let store = InMemoryBlobStore::new();
        store.create(Bucket::ItemImages, "wh/a.png", vec![1]).await.unwrap();
        assert!(matches!(
            store.create(Bucket::ItemImages, "wh/a.png", vec![2]).await,
            Err(BlobError::AlreadyExists { bucket: Bucket::ItemImages, .. })
        ));
        // Same path in another bucket is a different object.
        store.create(Bucket::FieldPhotos, "wh/a.png", vec![3]).await.unwrap();
        assert_eq!(store.get(Bucket::ItemImages, "wh/a.png").await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn local_store_writes_under_bucket_dir() {
        let root = std::env::temp_dir().join(format!("opsconsole-blobs-{}", uuid::Uuid::now_v7()));
        let store = LocalBlobStore::new(&root);
        store
            .put(Bucket::ItemImages, "wh/drill.png", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(root.join("item-images").join("wh").join("drill.png").exists());
        assert_eq!(store.get(Bucket::ItemImages, "wh/drill.png").await.unwrap(), vec![1, 2, 3]);
        assert!(store.get(Bucket::ItemImages, "../escape").await.is_err());

        store
            .create(Bucket::FieldPhotos, "site/2.jpg", vec![7])
            .await
            .unwrap();
        assert!(matches!(
            store.create(Bucket::FieldPhotos, "site/2.jpg", vec![8]).await,
            Err(BlobError::AlreadyExists { .. })
        ));
        assert_eq!(store.get(Bucket::FieldPhotos, "site/2.jpg").await.unwrap(), vec![7]);
        let _ = std::fs::remove_dir_all(root);
    }
}
