//! Paginated fetch-and-upsert loop.
//!
//! Pages are requested from page 1 upward; a page with zero records, or with
//! fewer records than the page size, ends the run. Transport and parse
//! failures abort the whole run. Records that cannot produce a document key
//! are skipped and logged; everything else flows through the field mapper
//! into the batch writer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::store::writer::BatchWriter;
use crate::store::{DocumentStore, FESTIVALS};
use crate::util::env::env_parse;

use super::client::TourClient;
use super::mapper::{doc_key, map_record, RawRecord};

/// Source tag stamped into festival documents.
pub const FESTIVAL_SOURCE: &str = "TourAPI-v2";

/// Default per-run deadline, seconds. Guards against an upstream that keeps
/// returning full pages forever.
const DEFAULT_DEADLINE_SECS: u64 = 540;

/// One page-at-a-time record source. The seam exists so the termination rule
/// can be tested without a network.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Requested records per page.
    fn page_size(&self) -> u32;

    /// Fetch and parse one page. An `Err` aborts the run.
    async fn fetch_page(&self, page_no: u32) -> Result<Vec<RawRecord>>;
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct SyncSummary {
    pub pages: u32,
    pub written: usize,
    pub skipped: usize,
}

/// Drive the fetch loop into the given collection.
pub async fn run_paged_sync<S>(
    source: &S,
    store: &dyn DocumentStore,
    collection: &str,
    source_tag: &str,
) -> Result<SyncSummary>
where
    S: PageSource + ?Sized,
{
    let page_size = source.page_size();
    let mut writer = BatchWriter::new(store, collection);
    let mut summary = SyncSummary::default();
    let mut page_no: u32 = 1;

    loop {
        let items = source.fetch_page(page_no).await?;
        summary.pages += 1;
        if items.is_empty() {
            break;
        }

        let now = Utc::now();
        for raw in &items {
            let Some(key) = doc_key(raw) else {
                warn!(page_no, "record without id or title; skipping");
                summary.skipped += 1;
                continue;
            };
            let doc = map_record(raw, source_tag, now);
            writer
                .push(key, serde_json::to_value(doc)?)
                .await
                .context("batch write failed")?;
        }

        if (items.len() as u32) < page_size {
            break;
        }
        page_no += 1;
    }

    summary.written = writer.flush().await?;
    Ok(summary)
}

/// Full festival sync: the entry point shared by the manual HTTP trigger, the
/// monthly schedule, and the one-shot binary. Runs under an explicit deadline.
pub async fn run_festival_sync(
    client: &TourClient,
    store: &dyn DocumentStore,
) -> Result<SyncSummary> {
    let deadline = Duration::from_secs(env_parse("SYNC_DEADLINE_SECS", DEFAULT_DEADLINE_SECS));
    let summary = timeout(
        deadline,
        run_paged_sync(client, store, FESTIVALS, FESTIVAL_SOURCE),
    )
    .await
    .map_err(|_| anyhow::anyhow!("festival sync exceeded deadline of {deadline:?}"))??;

    info!(
        pages = summary.pages,
        written = summary.written,
        skipped = summary.skipped,
        "festival sync finished"
    );
    Ok(summary)
}
