//! Poster composition pipeline: two text-generation calls, one image
//! download, one composite, one upload. Each request runs the whole pipeline
//! or fails as a unit; no partial results are surfaced.

pub mod compose;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::storage::StorageClient;
use crate::util::env::{env_opt, env_req};

const DEFAULT_GENLANG_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
const DEFAULT_TEMPLATE: &str = "poster_template.png";

/// Client for the text-generation API.
#[derive(Debug, Clone)]
pub struct TextGenClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl TextGenClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build text-gen http client")?;
        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from the environment; fails fast when the key is absent.
    pub fn from_env() -> Result<Self> {
        let api_key = env_req("GENLANG_API_KEY")?;
        let api_url = env_opt("GENLANG_API_URL").unwrap_or_else(|| DEFAULT_GENLANG_URL.to_string());
        Self::new(api_url, api_key)
    }

    /// One generation call; returns the model's first text candidate.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        let resp = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("text generation request failed")?;
        if !resp.status().is_success() {
            bail!("text generation returned {}", resp.status());
        }
        let payload: Value = resp
            .json()
            .await
            .context("failed to read text generation response")?;
        extract_candidate_text(&payload)
            .ok_or_else(|| anyhow::anyhow!("text generation response had no candidates"))
    }
}

fn extract_candidate_text(payload: &Value) -> Option<String> {
    let text = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Validated poster request.
#[derive(Debug, Clone)]
pub struct PosterRequest {
    pub title_prompt: String,
    pub subtitle_prompt: String,
    pub ai_image_url: String,
    pub template_file_name: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterResult {
    pub poster_url: String,
    pub generated_title: String,
    pub generated_subtitle: String,
}

#[derive(Clone)]
pub struct PosterPipeline {
    textgen: TextGenClient,
    storage: StorageClient,
    http: Client,
    template_dir: PathBuf,
}

impl PosterPipeline {
    pub fn new(
        textgen: TextGenClient,
        storage: StorageClient,
        template_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build poster http client")?;
        Ok(Self {
            textgen,
            storage,
            http,
            template_dir: template_dir.into(),
        })
    }

    pub fn from_env(storage: StorageClient) -> Result<Self> {
        let template_dir = env_opt("TEMPLATE_DIR").unwrap_or_else(|| "templates".to_string());
        Self::new(TextGenClient::from_env()?, storage, template_dir)
    }

    fn template_path(&self, name: Option<&str>) -> Result<PathBuf> {
        let name = name.unwrap_or(DEFAULT_TEMPLATE);
        // template names address files inside the template dir only
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            bail!("invalid template file name: {name:?}");
        }
        Ok(self.template_dir.join(name))
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, req: &PosterRequest) -> Result<PosterResult> {
        let generated_title = self
            .textgen
            .generate(&req.title_prompt)
            .await
            .context("title generation failed")?;
        let generated_subtitle = self
            .textgen
            .generate(&req.subtitle_prompt)
            .await
            .context("subtitle generation failed")?;

        let resp = self
            .http
            .get(&req.ai_image_url)
            .send()
            .await
            .context("image download failed")?;
        if !resp.status().is_success() {
            bail!("image download returned {}", resp.status());
        }
        let overlay = resp.bytes().await.context("failed to read image body")?;

        let template_path = self.template_path(req.template_file_name.as_deref())?;
        let template = tokio::fs::read(&template_path)
            .await
            .with_context(|| format!("failed to read template {}", template_path.display()))?;

        let poster = compose::compose_poster(&template, &overlay)?;

        let object = format!("posters/poster-{}.png", uuid::Uuid::new_v4());
        let poster_url = self
            .storage
            .upload(&object, "image/png", poster)
            .await
            .context("poster upload failed")?;

        info!(object = %object, "poster composed and uploaded");
        Ok(PosterResult {
            poster_url,
            generated_title,
            generated_subtitle,
        })
    }
}
