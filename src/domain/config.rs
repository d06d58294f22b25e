use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Provider {
    #[serde(rename = "qiniu")]
    Qiniu,
}

/// Credentials and addressing for one Qiniu bucket. Loaded once at adapter
/// construction and never reloaded.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QiniuConfig {
    #[serde(rename = "accessKey")]
    pub access_key: String,
    #[serde(rename = "accessSecret")]
    pub access_secret: String,
    #[serde(rename = "bucket")]
    pub bucket: String,
    #[serde(rename = "zone")]
    pub zone: String,
    #[serde(rename = "domain")]
    pub domain: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OssConfig {
    pub provider: Provider,
    #[serde(rename = "qiniu")]
    pub qiniu: Option<QiniuConfig>,
    /// Process-wide HTTP proxy for outbound image fetches. Empty/absent
    /// means direct connection.
    #[serde(rename = "proxyUrl", default)]
    pub proxy_url: Option<String>,
}
