//! Object storage client: plain HTTP download of bucket objects and media
//! upload of composited posters. The read URL returned after an upload is the
//! bucket's public object URL, which does not expire.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

use crate::util::env::{env_opt, env_req};

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

#[derive(Debug, Clone)]
pub struct StorageClient {
    http: Client,
    base_url: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build storage http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env_opt("STORAGE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let bucket = env_req("STORAGE_BUCKET")?;
        Self::new(base_url, bucket)
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        let encoded: Vec<String> = object
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/{}/{}", self.base_url, bucket, encoded.join("/"))
    }

    /// Download one object from the named bucket.
    pub async fn download(&self, bucket: &str, object: &str) -> Result<Bytes> {
        let url = self.object_url(bucket, object);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("storage download failed: {object}"))?;
        if !resp.status().is_success() {
            bail!("storage download of {object} returned {}", resp.status());
        }
        resp.bytes().await.context("failed to read object body")
    }

    /// Upload bytes to the configured bucket and return a long-lived read URL.
    pub async fn upload(&self, object: &str, content_type: &str, body: Vec<u8>) -> Result<String> {
        let upload_url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(object)
        );
        let resp = self
            .http
            .post(&upload_url)
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .with_context(|| format!("storage upload failed: {object}"))?;
        if !resp.status().is_success() {
            bail!("storage upload of {object} returned {}", resp.status());
        }
        Ok(self.object_url(&self.bucket, object))
    }
}
