mod downloader;
mod error;
mod qiniu_client;
mod qiniu_oss;

pub use downloader::{DownloadError, HttpImageDownloader, ImageDownloader};
pub use error::UploadError;
pub use qiniu_client::{
    BucketManager, ClientError, Credential, FormUploadClient, PutPolicy, PutResult, Region,
};
pub use qiniu_oss::QiniuOssUploader;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    config::{OssConfig, Provider},
    models::form::FormPayload,
};

/// Provider-agnostic upload capability. Every implementation issues unique
/// object keys, returns public URLs of the same shape, and reports failures
/// through the same error taxonomy, so backends are interchangeable.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload the named file part of an inbound form and return its public URL.
    async fn put_file(&self, form: &FormPayload, field: &str) -> Result<String, UploadError>;

    /// Fetch a remote image, re-host it, and return the new public URL.
    async fn put_img(&self, image_url: &str) -> Result<String, UploadError>;

    /// Remove the object behind a previously issued public URL.
    async fn delete(&self, file_url: &str) -> Result<(), UploadError>;
}

impl std::fmt::Debug for dyn Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Uploader")
    }
}

pub fn create_uploader(config: &OssConfig) -> Result<Arc<dyn Uploader>, UploadError> {
    match config.provider {
        Provider::Qiniu => {
            let qiniu = config
                .qiniu
                .as_ref()
                .ok_or_else(|| UploadError::Config("qiniu config not found".to_string()))?;

            let service = QiniuOssUploader::new(qiniu.clone(), config.proxy_url.clone());
            Ok(Arc::new(service))
        }
    }
}
