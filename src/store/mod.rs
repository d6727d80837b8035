//! Document store: one keyed JSON collection per entity type, merge-upsert
//! writes. The Postgres implementation keeps each collection in its own table
//! with a `JSONB` document column; merge semantics come from the `||`
//! operator, so fields absent from a new write survive from the stored
//! document.

pub mod writer;

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Collection holding festival documents from the Tour API.
pub const FESTIVALS: &str = "festivals";
/// Collection holding village documents from uploaded XML files.
/// The capitalized name is fixed by the existing data set.
pub const VILLAGES: &str = "Villages";

/// Seam over the concrete store so ingestion logic and its tests do not need
/// a live database. Writes are merge-upserts: a committed document merges
/// field-by-field into any existing document at the same key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Atomically apply one bounded group of (key, document) writes.
    async fn commit_batch(&self, collection: &str, docs: &[(String, Value)]) -> Result<()>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> Result<()>;
}

/// Collapse duplicate keys inside one batch so a single statement never
/// touches the same row twice; later writes merge over earlier ones.
fn collapse_batch(docs: &[(String, Value)]) -> Vec<(String, Value)> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Value> = HashMap::new();
    for (key, doc) in docs {
        match merged.get_mut(key) {
            Some(existing) => merge_into(existing, doc),
            None => {
                order.push(key.clone());
                merged.insert(key.clone(), doc.clone());
            }
        }
    }
    order
        .into_iter()
        .map(|k| {
            let v = merged.remove(&k).unwrap_or(Value::Null);
            (k, v)
        })
        .collect()
}

/// Shallow object merge: fields present in `incoming` overwrite, everything
/// else is preserved. Mirrors the JSONB `||` operator used by Postgres.
fn merge_into(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::Object(base), Value::Object(new)) => {
            for (k, v) in new {
                base.insert(k.clone(), v.clone());
            }
        }
        (slot, other) => *slot = other.clone(),
    }
}

/// Postgres-backed document store.
#[derive(Clone)]
pub struct PgDocStore {
    pub pool: PgPool,
}

impl PgDocStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .context("failed to connect to document store")?;
        info!("connected to document store");

        let store = Self { pool };
        for coll in [FESTIVALS, VILLAGES] {
            store.ensure_collection(coll).await?;
        }
        Ok(store)
    }

    /// Idempotent schema bootstrap for one collection table.
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        let table = table_name(collection)?;
        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                doc_id     TEXT PRIMARY KEY,
                data       JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to create collection table {collection}"))?;
        Ok(())
    }
}

/// Collection names are interpolated into DDL/DML as quoted identifiers, so
/// restrict them to a safe character set.
fn table_name(collection: &str) -> Result<String> {
    let ok = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !ok {
        anyhow::bail!("invalid collection name: {collection:?}");
    }
    Ok(collection.to_string())
}

#[async_trait]
impl DocumentStore for PgDocStore {
    async fn commit_batch(&self, collection: &str, docs: &[(String, Value)]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let table = table_name(collection)?;
        let docs = collapse_batch(docs);

        let sql = format!(
            r#"INSERT INTO "{table}" (doc_id, data, updated_at)
               VALUES ($1, $2, now())
               ON CONFLICT (doc_id)
               DO UPDATE SET data = "{table}".data || EXCLUDED.data, updated_at = now()"#
        );

        let mut tx = self.pool.begin().await.context("begin batch")?;
        for (key, doc) in &docs {
            sqlx::query(&sql)
                .bind(key)
                .bind(sqlx::types::Json(doc))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("upsert failed for doc {key}"))?;
        }
        tx.commit().await.context("commit batch")?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, bool>("SELECT true")
            .fetch_one(&self.pool)
            .await
            .context("store ping failed")?;
        Ok(())
    }
}

/// In-memory store with the same visible merge semantics as the Postgres
/// implementation. Used by tests and by handler wiring in test builds.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
    commits: RwLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned()
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Number of batch commits applied so far.
    pub async fn commit_count(&self) -> usize {
        *self.commits.read().await
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn commit_batch(&self, collection: &str, docs: &[(String, Value)]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let mut colls = self.collections.write().await;
        let coll = colls.entry(collection.to_string()).or_default();
        for (key, doc) in collapse_batch(docs) {
            match coll.get_mut(&key) {
                Some(existing) => merge_into(existing, &doc),
                None => {
                    coll.insert(key, doc);
                }
            }
        }
        *self.commits.write().await += 1;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn merge_preserves_fields_absent_from_new_write() {
        let store = MemoryStore::new();
        store
            .commit_batch(
                FESTIVALS,
                &[("k1".into(), json!({"title": "Festival", "tel": "043-000"}))],
            )
            .await
            .unwrap();
        store
            .commit_batch(FESTIVALS, &[("k1".into(), json!({"title": "Renamed"}))])
            .await
            .unwrap();

        let doc = store.get(FESTIVALS, "k1").await.unwrap();
        assert_eq!(doc["title"], "Renamed");
        assert_eq!(doc["tel"], "043-000");
    }

    #[tokio::test]
    async fn duplicate_keys_in_one_batch_collapse_last_write_wins() {
        let store = MemoryStore::new();
        store
            .commit_batch(
                FESTIVALS,
                &[
                    ("k1".into(), json!({"title": "First", "zipcode": "12345"})),
                    ("k1".into(), json!({"title": "Second"})),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.len(FESTIVALS).await, 1);
        let doc = store.get(FESTIVALS, "k1").await.unwrap();
        assert_eq!(doc["title"], "Second");
        assert_eq!(doc["zipcode"], "12345");
    }

    #[test]
    fn rejects_unsafe_collection_names() {
        assert!(table_name("festivals").is_ok());
        assert!(table_name("Villages").is_ok());
        assert!(table_name("bad;drop").is_err());
        assert!(table_name("").is_err());
    }
}
