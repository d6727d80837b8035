//! Finalize-event pipeline for village XML uploads:
//! triggered -> path-filtered -> downloaded -> parsed -> batched-write -> done.
//!
//! Objects outside the `village-uploads/*.xml` convention are ignored without
//! a download. A malformed file is logged and dropped rather than returned as
//! an error, so one bad upload cannot keep the event delivery retrying.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::storage::StorageClient;
use crate::store::writer::BatchWriter;
use crate::store::{DocumentStore, VILLAGES};
use crate::tour::mapper::{doc_key, map_record};
use crate::tour::xml::parse_village_file;

/// Source tag stamped into village documents.
pub const VILLAGE_SOURCE: &str = "VillageXML";

const PATH_PREFIX: &str = "village-uploads/";
const PATH_SUFFIX: &str = ".xml";

/// Object finalize notification, as delivered by the storage push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeEvent {
    pub bucket: String,
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub enum TriggerOutcome {
    /// Object path is outside the upload convention; nothing was downloaded.
    NotApplicable,
    /// File downloaded but its XML did not parse; nothing was written.
    ParseRejected,
    Processed { written: usize, skipped: usize },
}

fn path_applies(name: &str) -> bool {
    name.starts_with(PATH_PREFIX) && name.ends_with(PATH_SUFFIX)
}

/// Run the full trigger pipeline for one finalize event.
pub async fn handle_finalize(
    event: &FinalizeEvent,
    storage: &StorageClient,
    store: &dyn DocumentStore,
) -> Result<TriggerOutcome> {
    if !path_applies(&event.name) {
        info!(object = %event.name, "finalize event outside upload convention; ignoring");
        return Ok(TriggerOutcome::NotApplicable);
    }

    let bytes = storage
        .download(&event.bucket, &event.name)
        .await
        .with_context(|| format!("failed to download {}", event.name))?;

    // Work from a local temp copy, removed best-effort afterwards.
    let tmp = temp_path();
    tokio::fs::write(&tmp, &bytes)
        .await
        .context("failed to write temp copy")?;
    let outcome = process_file(&tmp, store).await;
    if let Err(e) = tokio::fs::remove_file(&tmp).await {
        warn!(path = %tmp.display(), "failed to remove temp copy: {e}");
    }
    outcome
}

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("village-{}.xml", uuid::Uuid::new_v4()))
}

async fn process_file(path: &PathBuf, store: &dyn DocumentStore) -> Result<TriggerOutcome> {
    let xml = tokio::fs::read_to_string(path)
        .await
        .context("failed to read temp copy")?;

    let records = match parse_village_file(&xml) {
        Ok(records) => records,
        Err(e) => {
            warn!("village file rejected: {e:#}");
            return Ok(TriggerOutcome::ParseRejected);
        }
    };

    let mut writer = BatchWriter::new(store, VILLAGES);
    let mut skipped = 0usize;
    let now = Utc::now();
    for raw in &records {
        let Some(key) = doc_key(raw) else {
            warn!("village record without id or name; skipping");
            skipped += 1;
            continue;
        };
        let doc = map_record(raw, VILLAGE_SOURCE, now);
        writer.push(key, serde_json::to_value(doc)?).await?;
    }
    let written = writer.flush().await?;

    info!(written, skipped, "village file ingested");
    Ok(TriggerOutcome::Processed { written, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn path_filter_accepts_only_the_upload_convention() {
        assert!(path_applies("village-uploads/danyang.xml"));
        assert!(!path_applies("docs/readme.txt"));
        assert!(!path_applies("village-uploads/danyang.json"));
        assert!(!path_applies("other/village-uploads/danyang.xml"));
    }

    #[tokio::test]
    async fn unrelated_object_exits_before_any_download() {
        // A client pointed at an unroutable base URL: if the filter failed to
        // short-circuit, the download would error instead of NotApplicable.
        let storage = StorageClient::new("http://127.0.0.1:1", "b").unwrap();
        let store = MemoryStore::new();
        let event = FinalizeEvent {
            bucket: "b".into(),
            name: "docs/readme.txt".into(),
        };
        let outcome = handle_finalize(&event, &storage, &store).await.unwrap();
        assert_eq!(outcome, TriggerOutcome::NotApplicable);
        assert_eq!(store.len(VILLAGES).await, 0);
    }

    #[tokio::test]
    async fn valid_file_maps_and_writes_village_documents() {
        let xml = r#"<villages>
  <village>
    <contentid>v-100</contentid>
    <name>산골체험마을</name>
    <address>충북 단양군</address>
    <longitude>128.365</longitude>
    <latitude>36.984</latitude>
  </village>
  <village>
    <name>강변마을</name>
    <startDate>20260501</startDate>
  </village>
</villages>"#;
        let tmp = temp_path();
        tokio::fs::write(&tmp, xml).await.unwrap();
        let store = MemoryStore::new();

        let outcome = process_file(&tmp, &store).await.unwrap();
        let _ = tokio::fs::remove_file(&tmp).await;

        assert_eq!(
            outcome,
            TriggerOutcome::Processed {
                written: 2,
                skipped: 0
            }
        );
        let doc = store.get(VILLAGES, "v-100").await.unwrap();
        assert_eq!(doc["title"], "산골체험마을");
        assert_eq!(doc["addr1"], "충북 단양군");
        assert_eq!(doc["mapx"], 128.365);
        assert_eq!(doc["source"], VILLAGE_SOURCE);
    }

    #[tokio::test]
    async fn malformed_file_is_rejected_without_writes_and_cleaned_up() {
        let tmp = temp_path();
        tokio::fs::write(&tmp, "<villages><village><name>trunc").await.unwrap();
        let store = MemoryStore::new();

        let outcome = process_file(&tmp, &store).await.unwrap();
        let _ = tokio::fs::remove_file(&tmp).await;

        assert_eq!(outcome, TriggerOutcome::ParseRejected);
        assert_eq!(store.len(VILLAGES).await, 0);
    }
}
