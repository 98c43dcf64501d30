//! Object storage for uploaded files.
//!
//! Files are staged on local disk first, then handed to an [`ObjectStorage`]
//! implementation which returns the public URL of the stored object.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

#[derive(Error, Debug)]
pub enum ObjectStorageError {
    #[error("failed to stage file: {0}")]
    Staging(#[from] std::io::Error),
    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },
    #[error("object storage misconfigured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the file at `local_path` under `object_key` and return its public URL.
    async fn upload(&self, object_key: &str, local_path: &Path)
    -> Result<String, ObjectStorageError>;
}

pub type SharedObjectStorage = Arc<dyn ObjectStorage>;

/// Split a client file name into its stem and lowercase extension.
fn split_file_name(file_name: &str) -> (&str, Option<String>) {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (base, None),
    }
}

fn with_extension(key: String, ext: Option<String>) -> String {
    match ext {
        Some(ext) => format!("{key}.{ext}"),
        None => key,
    }
}

/// Object key for a session attachment:
/// `normalized-stem-<unix ts>-<8 hex>.<ext>`.
pub fn attachment_object_key(file_name: &str, unix_ts: i64) -> String {
    let (stem, ext) = split_file_name(file_name);
    let lowered = stem.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "file" } else { slug };

    let suffix = Uuid::new_v4().simple().to_string();
    with_extension(format!("{slug}-{unix_ts}-{}", &suffix[..8]), ext)
}

/// Object key for a workspace avatar: `<uuid>.<ext>`.
pub fn avatar_object_key(file_name: &str) -> String {
    let (_, ext) = split_file_name(file_name);
    with_extension(Uuid::new_v4().to_string(), ext)
}

/// Write `bytes` into the staging directory, upload it, and remove the
/// staged copy whatever the upload outcome.
pub async fn stage_and_upload(
    storage: &dyn ObjectStorage,
    staging_dir: &Path,
    object_key: &str,
    bytes: &[u8],
) -> Result<String, ObjectStorageError> {
    tokio::fs::create_dir_all(staging_dir).await?;
    let staged = staging_dir.join(object_key);
    tokio::fs::write(&staged, bytes).await?;
    debug!("Staged {} bytes at {:?}", bytes.len(), staged);

    let result = storage.upload(object_key, &staged).await;

    if let Err(e) = tokio::fs::remove_file(&staged).await {
        warn!("Failed to remove staged file {:?}: {}", staged, e);
    }
    result
}

/// S3 settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Uploads with `public-read` ACL to an S3 bucket.
pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub fn new(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "environment",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: settings.bucket.clone(),
        }
    }
}

/// Public URL of an object in a bucket with `public-read` ACL.
pub fn s3_public_url(bucket: &str, object_key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{object_key}")
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(
        &self,
        object_key: &str,
        local_path: &Path,
    ) -> Result<String, ObjectStorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| ObjectStorageError::Upload {
                key: object_key.to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key)
            .body(body)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| ObjectStorageError::Upload {
                key: object_key.to_string(),
                message: e.to_string(),
            })?;

        info!("Uploaded {} to bucket {}", object_key, self.bucket);
        Ok(s3_public_url(&self.bucket, object_key))
    }
}

/// Copies uploads into a local directory that the server exposes at `/uploads`.
pub struct FileObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FileObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for FileObjectStorage {
    async fn upload(
        &self,
        object_key: &str,
        local_path: &Path,
    ) -> Result<String, ObjectStorageError> {
        if object_key.contains(['/', '\\']) || object_key.starts_with('.') {
            return Err(ObjectStorageError::Configuration(format!(
                "object key {object_key:?} is not a plain file name"
            )));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::copy(local_path, self.root.join(object_key)).await?;

        debug!("Stored {} under {:?}", object_key, self.root);
        Ok(format!("{}/uploads/{}", self.public_base_url, object_key))
    }
}
