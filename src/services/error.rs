use thiserror::Error;

use crate::services::downloader::DownloadError;
use crate::services::qiniu_client::ClientError;

/// Failures of the three uploader operations. Every variant carries the
/// underlying cause; nothing is retried or suppressed at this level.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("form field '{0}' missing or malformed")]
    FormFieldMissing(String),

    #[error("cannot open uploaded file: {0}")]
    FileOpen(String),

    #[error("error with download image {url}: {source}")]
    ImageDownload {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("upload failed: {0}")]
    Upload(#[source] ClientError),

    #[error("deletion failed: {0}")]
    Deletion(#[source] ClientError),

    #[error("invalid storage configuration: {0}")]
    Config(String),
}
