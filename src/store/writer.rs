//! Buffered batch upsert writer. Documents are grouped into bounded batches
//! and each batch is committed atomically; there is no rollback across
//! batches, so a mid-run failure leaves earlier batches applied.

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use super::DocumentStore;

/// Transactional batch limit of the underlying store.
pub const MAX_BATCH: usize = 500;

pub struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
    buf: Vec<(String, Value)>,
    written: usize,
    batches: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, collection: &'a str) -> Self {
        Self {
            store,
            collection,
            buf: Vec::with_capacity(MAX_BATCH),
            written: 0,
            batches: 0,
        }
    }

    /// Buffer one document, committing a full batch when the limit is hit.
    pub async fn push(&mut self, key: String, doc: Value) -> Result<()> {
        self.buf.push((key, doc));
        if self.buf.len() >= MAX_BATCH {
            self.commit().await?;
        }
        Ok(())
    }

    /// Commit any final partial batch and return the total documents written.
    pub async fn flush(mut self) -> Result<usize> {
        if !self.buf.is_empty() {
            self.commit().await?;
        }
        Ok(self.written)
    }

    /// Number of batches committed so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    async fn commit(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.buf);
        let size = batch.len();
        self.store.commit_batch(self.collection, &batch).await?;
        self.written += size;
        self.batches += 1;
        debug!(
            collection = self.collection,
            batch = self.batches,
            size,
            "batch committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, FESTIVALS};
    use serde_json::json;

    #[tokio::test]
    async fn splits_into_bounded_batches_and_flushes_remainder() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(&store, FESTIVALS);
        for i in 0..1201 {
            writer
                .push(format!("doc-{i}"), json!({"title": format!("t{i}")}))
                .await
                .unwrap();
        }
        let written = writer.flush().await.unwrap();

        assert_eq!(written, 1201);
        assert_eq!(store.len(FESTIVALS).await, 1201);
        // 500 + 500 + 201
        assert_eq!(store.commit_count().await, 3);
    }

    #[tokio::test]
    async fn flush_commits_partial_batch_only_once() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(&store, FESTIVALS);
        for i in 0..42 {
            writer
                .push(format!("doc-{i}"), json!({"title": "t"}))
                .await
                .unwrap();
        }
        let written = writer.flush().await.unwrap();

        assert_eq!(written, 42);
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn empty_writer_flushes_nothing() {
        let store = MemoryStore::new();
        let writer = BatchWriter::new(&store, FESTIVALS);
        assert_eq!(writer.flush().await.unwrap(), 0);
        assert_eq!(store.commit_count().await, 0);
    }
}
