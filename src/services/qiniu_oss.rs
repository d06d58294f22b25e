use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    domain::{config::QiniuConfig, models::form::FormPayload},
    services::{
        downloader::{HttpImageDownloader, ImageDownloader},
        error::UploadError,
        qiniu_client::{
            BucketManager, Credential, FormUploadClient, PutPolicy, QiniuBucketManager,
            QiniuFormUploader, Region,
        },
        Uploader,
    },
};

/// Namespace prefix partitioning this service's uploads from other tenants
/// of the same bucket.
const UPLOAD_DIR: &str = "chatgpt-plus";

const TOKEN_LIFETIME_SECS: u64 = 3600;

/// Qiniu implementation of the [`Uploader`] capability.
///
/// Holds immutable configuration, the bucket-scoped upload token derived at
/// construction, and the provider clients. Safe to share across concurrent
/// requests: the only mutable state is the key timestamp clamp.
pub struct QiniuOssUploader {
    config: QiniuConfig,
    token: String,
    uploader: Arc<dyn FormUploadClient>,
    manager: Arc<dyn BucketManager>,
    downloader: Arc<dyn ImageDownloader>,
    proxy_url: Option<String>,
    dir: &'static str,
    last_stamp: AtomicI64,
}

impl QiniuOssUploader {
    /// Build a ready-to-use adapter. Performs no network I/O: the upload
    /// token is computed locally and an unresolvable zone degrades to the
    /// Huanan region instead of failing startup.
    pub fn new(config: QiniuConfig, proxy_url: Option<String>) -> Self {
        let region = Region::from_id(&config.zone).unwrap_or_else(|| {
            warn!(
                "unknown qiniu zone '{}', falling back to region {}",
                config.zone,
                Region::huanan().id
            );
            Region::huanan()
        });

        let credential = Credential::new(config.access_key.clone(), config.access_secret.clone());
        let token =
            credential.upload_token(&PutPolicy::bucket_scope(&config.bucket, TOKEN_LIFETIME_SECS));

        Self {
            token,
            uploader: Arc::new(QiniuFormUploader::new(region.clone())),
            manager: Arc::new(QiniuBucketManager::new(credential, region)),
            downloader: Arc::new(HttpImageDownloader::new()),
            config,
            proxy_url,
            dir: UPLOAD_DIR,
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Microsecond timestamp clamped to be strictly increasing per adapter,
    /// so concurrent uploads landing in the same microsecond still get
    /// distinct keys.
    fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let mut prev = self.last_stamp.load(Ordering::SeqCst);
        loop {
            let stamp = now.max(prev + 1);
            match self
                .last_stamp
                .compare_exchange(prev, stamp, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return stamp,
                Err(actual) => prev = actual,
            }
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.config.domain, key)
    }
}

#[async_trait]
impl Uploader for QiniuOssUploader {
    async fn put_file(&self, form: &FormPayload, field: &str) -> Result<String, UploadError> {
        let file = match form.file(field) {
            None => return Err(UploadError::FormFieldMissing(field.to_string())),
            Some(Err(cause)) => return Err(UploadError::FileOpen(cause.clone())),
            Some(Ok(file)) => file,
        };

        let key = object_key(self.dir, self.next_stamp(), &file.filename);
        let ret = self
            .uploader
            .put(&self.token, &key, &file.content, file.size())
            .await
            .map_err(UploadError::Upload)?;

        info!("uploaded form file '{}' as {}", file.filename, ret.key);
        Ok(self.public_url(&ret.key))
    }

    async fn put_img(&self, image_url: &str) -> Result<String, UploadError> {
        let image_data = self
            .downloader
            .download(image_url, self.proxy_url.as_deref())
            .await
            .map_err(|source| UploadError::ImageDownload {
                url: image_url.to_string(),
                source,
            })?;

        let size = image_data.len() as u64;
        let key = object_key(self.dir, self.next_stamp(), url_basename(image_url));
        let ret = self
            .uploader
            .put(&self.token, &key, &image_data, size)
            .await
            .map_err(UploadError::Upload)?;

        info!("rehosted image {} as {}", image_url, ret.key);
        Ok(self.public_url(&ret.key))
    }

    async fn delete(&self, file_url: &str) -> Result<(), UploadError> {
        // Keys are always issued as `<dir>/<basename>`, so the URL basename
        // plus the fixed namespace addresses the object. A URL this adapter
        // did not issue will target the wrong key.
        let key = format!("{}/{}", self.dir, url_basename(file_url));
        self.manager
            .delete(&self.config.bucket, &key)
            .await
            .map_err(UploadError::Deletion)
    }
}

/// `<dir>/<micros><ext>`, the remote path of one uploaded object. Uniqueness
/// comes from the microsecond timestamp.
fn object_key(dir: &str, micros: i64, source_name: &str) -> String {
    format!("{}/{}{}", dir, micros, extension_of(source_name))
}

/// File extension including the leading dot, or empty when there is none.
fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Trailing path segment of a URL, with query and fragment stripped.
fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}
