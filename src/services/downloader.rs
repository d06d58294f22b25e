use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("invalid proxy url '{url}': {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetches the full byte payload of a remote image, optionally through an
/// HTTP proxy.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(&self, url: &str, proxy_url: Option<&str>) -> Result<Vec<u8>, DownloadError>;
}

pub struct HttpImageDownloader {
    client: Client,
}

impl HttpImageDownloader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpImageDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageDownloader for HttpImageDownloader {
    async fn download(&self, url: &str, proxy_url: Option<&str>) -> Result<Vec<u8>, DownloadError> {
        let response = match proxy_url {
            Some(proxy) if !proxy.is_empty() => {
                let proxied = Client::builder()
                    .proxy(Proxy::all(proxy).map_err(|source| DownloadError::Proxy {
                        url: proxy.to_string(),
                        source,
                    })?)
                    .build()?;
                proxied.get(url).send().await?
            }
            _ => self.client.get(url).send().await?,
        };

        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
