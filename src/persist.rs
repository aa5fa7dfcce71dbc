//! Feed persistence
//!
//! A sink accepts one fully encoded feed document and writes it to its
//! configured target. Writes are all-or-nothing: on failure the previous
//! document (if any) must be left intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use tempfile::NamedTempFile;
use tracing::info;

/// Writes an encoded feed document to a durable target.
#[async_trait]
pub trait Sink {
    /// Persist the feed document, replacing any previous one.
    async fn persist(&self, feed: &[u8]) -> Result<()>;
}

/// Persists the feed to an S3 object.
///
/// The object is uploaded publicly readable with `Content-Type: text/xml`
/// and `Cache-Control: no-cache`, so dashboards always poll the current
/// document.
pub struct S3Sink {
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
}

impl S3Sink {
    /// Create a sink writing to `s3://{bucket}/{key}`.
    #[must_use]
    pub fn new(
        config: &aws_config::SdkConfig,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl Sink for S3Sink {
    async fn persist(&self, feed: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .acl(ObjectCannedAcl::PublicRead)
            .cache_control("no-cache")
            .content_type("text/xml")
            .body(ByteStream::from(feed.to_vec()))
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .with_context(|| {
                format!("unable to upload feed to s3://{}/{}", self.bucket, self.key)
            })?;

        info!(bucket = %self.bucket, key = %self.key, "uploaded feed");
        Ok(())
    }
}

/// Persists the feed to a local file with atomic replace semantics.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink writing to the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Sink for FileSink {
    /// Write the feed to a temp file in the target directory, then rename
    /// it over the target. A failed write leaves the prior file intact.
    async fn persist(&self, feed: &[u8]) -> Result<()> {
        let target_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(target_dir).with_context(|| {
            format!(
                "unable to create temporary file in '{}'",
                target_dir.display()
            )
        })?;
        temp.write_all(feed)
            .with_context(|| format!("unable to write feed for '{}'", self.path.display()))?;
        temp.persist(&self.path)
            .with_context(|| format!("unable to replace '{}'", self.path.display()))?;

        info!(path = %self.path.display(), "wrote feed");
        Ok(())
    }
}
