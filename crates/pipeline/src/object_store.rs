//! Object storage boundary: uploads, transcript artifacts, and synthesized
//! audio all live in buckets behind this trait.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub type ObjectMetadata = HashMap<String, String>;

/// Object-creation notification delivered to the transcription stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<()>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMetadata>;

    /// Externally reachable location of an object.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Filesystem-backed store: objects at `<root>/<bucket>/<key>` with a JSON
/// sidecar per object for content type and metadata.
pub struct FsObjectStore {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    metadata: ObjectMetadata,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn sidecar_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(format!("{key}.meta.json"))
    }
}

fn storage_err(context: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Storage(format!("{context}: {err}"))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("create bucket dir", e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| storage_err("write object", e))?;

        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        };
        let json =
            serde_json::to_vec(&sidecar).map_err(|e| storage_err("serialize metadata", e))?;
        tokio::fs::write(self.sidecar_path(bucket, key), json)
            .await
            .map_err(|e| storage_err("write metadata", e))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.object_path(bucket, key))
            .await
            .map_err(|e| storage_err("read object", e))
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let json = tokio::fs::read(self.sidecar_path(bucket, key))
            .await
            .map_err(|e| storage_err("read metadata", e))?;
        let sidecar: Sidecar =
            serde_json::from_slice(&json).map_err(|e| storage_err("parse metadata", e))?;
        Ok(sidecar.metadata)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{bucket}.s3.amazonaws.com/{key}")
    }
}
