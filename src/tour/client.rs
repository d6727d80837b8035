//! HTTP client for the government Tour API (KorService2/searchFestival2).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use crate::util::env::{env_opt, env_parse, env_req};

use super::mapper::RawRecord;
use super::sync::PageSource;
use super::xml::{parse_tour_page, RESULT_OK};

const DEFAULT_BASE_URL: &str = "https://apis.data.go.kr/B551011/KorService2/searchFestival2";
const DEFAULT_AREA_CODE: &str = "33"; // Chungcheongbuk-do
const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct TourClient {
    http: Client,
    base_url: String,
    service_key: String,
    area_code: String,
    page_size: u32,
    /// Earliest event start date, YYYYMMDD.
    event_start_date: String,
}

impl TourClient {
    /// Build from the environment. Fails fast when the service key is absent,
    /// before any network call.
    pub fn from_env() -> Result<Self> {
        let service_key = env_req("TOUR_API_KEY")?;
        let base_url = env_opt("TOUR_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let area_code =
            env_opt("TOUR_AREA_CODE").unwrap_or_else(|| DEFAULT_AREA_CODE.to_string());
        let page_size: u32 = env_parse("TOUR_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        let event_start_date = chrono::Utc::now().format("%Y%m%d").to_string();

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url,
            service_key,
            area_code,
            page_size,
            event_start_date,
        })
    }

    fn page_url(&self, page_no: u32) -> Result<url::Url> {
        let mut u = url::Url::parse(&self.base_url).context("bad TOUR_API_URL")?;
        u.query_pairs_mut()
            .append_pair("serviceKey", &self.service_key)
            .append_pair("MobileOS", "ETC")
            .append_pair("MobileApp", "Youthbuk")
            .append_pair("eventStartDate", &self.event_start_date)
            .append_pair("areaCode", &self.area_code)
            .append_pair("numOfRows", &self.page_size.to_string())
            .append_pair("pageNo", &page_no.to_string());
        Ok(u)
    }
}

#[cfg(test)]
impl TourClient {
    /// Client with a fixed key and defaults; never dialed in tests.
    pub(crate) fn for_tests() -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            service_key: "test-key".to_string(),
            area_code: DEFAULT_AREA_CODE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            event_start_date: "20260826".to_string(),
        }
    }
}

#[async_trait]
impl PageSource for TourClient {
    fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn fetch_page(&self, page_no: u32) -> Result<Vec<RawRecord>> {
        let url = self.page_url(page_no)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("tour api request failed (page {page_no})"))?;
        if !resp.status().is_success() {
            bail!("tour api returned {} (page {page_no})", resp.status());
        }
        let body = resp.text().await.context("failed to read tour api body")?;

        let page = parse_tour_page(&body)
            .with_context(|| format!("failed to parse tour api page {page_no}"))?;
        if let Some(code) = page.result_code.as_deref() {
            if code != RESULT_OK {
                bail!(
                    "tour api error result (page {page_no}): {} {}",
                    code,
                    page.result_msg.as_deref().unwrap_or("")
                );
            }
        }
        info!(page_no, items = page.items.len(), "fetched tour api page");
        Ok(page.items)
    }
}
