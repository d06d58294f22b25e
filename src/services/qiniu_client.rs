//! Qiniu storage collaborators: region table, request signing, and the
//! upload/management clients the adapter calls into.
//!
//! Uses reqwest with manual HMAC-SHA1 signing so no vendor SDK dependency
//! is needed.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{header, multipart, Client};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use thiserror::Error;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::Network("request timeout".to_string())
        } else if error.is_connect() {
            ClientError::Network(format!("connection failed: {}", error))
        } else if let Some(status) = error.status() {
            match status.as_u16() {
                401 | 403 => ClientError::Unauthorized(error.to_string()),
                s => ClientError::Provider {
                    status: s,
                    message: error.to_string(),
                },
            }
        } else {
            ClientError::Internal(error.to_string())
        }
    }
}

/// A Qiniu storage region: where form uploads and management calls go.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: &'static str,
    pub upload_host: &'static str,
    pub rs_host: &'static str,
}

const HUADONG: Region = Region {
    id: "z0",
    upload_host: "https://upload.qiniup.com",
    rs_host: "https://rs-z0.qiniuapi.com",
};

const HUABEI: Region = Region {
    id: "z1",
    upload_host: "https://upload-z1.qiniup.com",
    rs_host: "https://rs-z1.qiniuapi.com",
};

const HUANAN: Region = Region {
    id: "z2",
    upload_host: "https://upload-z2.qiniup.com",
    rs_host: "https://rs-z2.qiniuapi.com",
};

const NORTH_AMERICA: Region = Region {
    id: "na0",
    upload_host: "https://upload-na0.qiniup.com",
    rs_host: "https://rs-na0.qiniuapi.com",
};

const SINGAPORE: Region = Region {
    id: "as0",
    upload_host: "https://upload-as0.qiniup.com",
    rs_host: "https://rs-as0.qiniuapi.com",
};

impl Region {
    pub fn from_id(id: &str) -> Option<Region> {
        match id {
            "z0" => Some(HUADONG),
            "z1" => Some(HUABEI),
            "z2" => Some(HUANAN),
            "na0" => Some(NORTH_AMERICA),
            "as0" => Some(SINGAPORE),
            _ => None,
        }
    }

    pub fn huanan() -> Region {
        HUANAN
    }
}

/// Access key pair used to sign upload tokens and management requests.
#[derive(Debug, Clone)]
pub struct Credential {
    access_key: String,
    secret_key: String,
}

impl Credential {
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }

    fn sign(&self, data: &[u8]) -> String {
        let mut mac =
            HmacSha1::new_from_slice(self.secret_key.as_bytes()).expect("HMAC key length ok");
        mac.update(data);
        URL_SAFE.encode(mac.finalize().into_bytes())
    }

    /// Signed token authorizing form uploads under the policy's scope, in
    /// the form `<ak>:<sig>:<base64-policy>`.
    pub fn upload_token(&self, policy: &PutPolicy) -> String {
        let encoded =
            URL_SAFE.encode(serde_json::to_vec(policy).expect("put policy serializes to JSON"));
        let signature = self.sign(encoded.as_bytes());
        format!("{}:{}:{}", self.access_key, signature, encoded)
    }

    /// Authorization value for a management request against `path`.
    pub fn qbox_token(&self, path: &str) -> String {
        let data = format!("{}\n", path);
        format!("QBox {}:{}", self.access_key, self.sign(data.as_bytes()))
    }
}

/// Upload authorization policy. `scope` of a bare bucket name allows writes
/// to any key under that bucket.
#[derive(Debug, Serialize)]
pub struct PutPolicy {
    pub scope: String,
    pub deadline: u64,
}

impl PutPolicy {
    pub fn bucket_scope(bucket: &str, lifetime_secs: u64) -> Self {
        Self {
            scope: bucket.to_string(),
            deadline: Utc::now().timestamp() as u64 + lifetime_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PutResult {
    pub key: String,
    #[serde(default)]
    pub hash: String,
}

/// Form-upload side of the provider contract. `data` is borrowed; the
/// payload is only copied at the HTTP boundary.
#[async_trait]
pub trait FormUploadClient: Send + Sync {
    async fn put(
        &self,
        token: &str,
        key: &str,
        data: &[u8],
        size: u64,
    ) -> Result<PutResult, ClientError>;
}

/// Management side of the provider contract.
#[async_trait]
pub trait BucketManager: Send + Sync {
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ClientError>;
}

pub struct QiniuFormUploader {
    client: Client,
    region: Region,
}

impl QiniuFormUploader {
    pub fn new(region: Region) -> Self {
        Self {
            client: Client::new(),
            region,
        }
    }
}

#[async_trait]
impl FormUploadClient for QiniuFormUploader {
    async fn put(
        &self,
        token: &str,
        key: &str,
        data: &[u8],
        size: u64,
    ) -> Result<PutResult, ClientError> {
        debug!("form upload of {} bytes to key {}", size, key);

        let file_name = key.rsplit('/').next().unwrap_or(key).to_string();
        let file_part = multipart::Part::bytes(data.to_vec()).file_name(file_name);
        let form = multipart::Form::new()
            .text("token", token.to_string())
            .text("key", key.to_string())
            .part("file", file_part);

        let response = self
            .client
            .post(self.region.upload_host)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => ClientError::Unauthorized(message),
                _ => ClientError::Provider { status, message },
            });
        }

        let ret: PutResult = response
            .json()
            .await
            .map_err(|e| ClientError::Internal(e.to_string()))?;
        Ok(ret)
    }
}

pub struct QiniuBucketManager {
    client: Client,
    credential: Credential,
    region: Region,
}

impl QiniuBucketManager {
    pub fn new(credential: Credential, region: Region) -> Self {
        Self {
            client: Client::new(),
            credential,
            region,
        }
    }
}

#[async_trait]
impl BucketManager for QiniuBucketManager {
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ClientError> {
        let entry = URL_SAFE.encode(format!("{}:{}", bucket, key));
        let path = format!("/delete/{}", entry);
        let url = format!("{}{}", self.region.rs_host, path);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.credential.qbox_token(&path))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => ClientError::Unauthorized(message),
                _ => ClientError::Provider { status, message },
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_lookup_knows_all_zone_ids() {
        for id in ["z0", "z1", "z2", "na0", "as0"] {
            let region = Region::from_id(id).unwrap();
            assert_eq!(region.id, id);
            assert!(region.upload_host.starts_with("https://"));
            assert!(region.rs_host.starts_with("https://"));
        }
    }

    #[test]
    fn region_lookup_rejects_unknown_zone() {
        assert!(Region::from_id("mars-1").is_none());
        assert_eq!(Region::huanan().id, "z2");
    }

    #[test]
    fn upload_token_carries_signed_bucket_policy() {
        let credential = Credential::new("test-ak".to_string(), "test-sk".to_string());
        let policy = PutPolicy::bucket_scope("chat-bucket", 3600);
        let token = credential.upload_token(&policy);

        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "test-ak");

        let decoded = URL_SAFE.decode(parts[2]).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(parsed["scope"], "chat-bucket");
        assert!(parsed["deadline"].as_u64().unwrap() > Utc::now().timestamp() as u64);
    }

    #[test]
    fn signing_is_deterministic_and_key_dependent() {
        let a = Credential::new("ak".to_string(), "secret-one".to_string());
        let b = Credential::new("ak".to_string(), "secret-two".to_string());

        assert_eq!(a.qbox_token("/delete/abc"), a.qbox_token("/delete/abc"));
        assert_ne!(a.qbox_token("/delete/abc"), b.qbox_token("/delete/abc"));
        assert!(a.qbox_token("/delete/abc").starts_with("QBox ak:"));
    }
}
