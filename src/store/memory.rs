use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::client::{DocumentStore, Fields, SnapshotFeed, StoreDocument, StoreError};

// ============================================================================
// In-Memory Document Store
// ============================================================================
//
// Backend used by the demo binary and as the standard test double. Mirrors
// the hosted store's observable contract: per-document last-write-wins,
// partial field merge on `put`, and full-snapshot subscription feeds.
//
// ============================================================================

type Collection = BTreeMap<String, Fields>;

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    watchers: BTreeMap<String, Vec<mpsc::UnboundedSender<Vec<StoreDocument>>>>,
}

impl Inner {
    fn snapshot(&self, path: &str) -> Vec<StoreDocument> {
        self.collections
            .get(path)
            .map(|coll| {
                coll.iter()
                    .map(|(id, fields)| StoreDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&mut self, path: &str) {
        let snapshot = self.snapshot(path);
        if let Some(senders) = self.watchers.get_mut(path) {
            senders.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Lock discipline: the RwLock is never held across an await point; every
// trait method completes its critical section synchronously.
#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, path: &str) -> Result<Vec<StoreDocument>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.snapshot(path))
    }

    async fn query(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoreDocument>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .snapshot(path)
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn get(&self, path: &str, id: &str) -> Result<Option<StoreDocument>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .collections
            .get(path)
            .and_then(|coll| coll.get(id))
            .map(|fields| StoreDocument::new(id, fields.clone())))
    }

    async fn put(&self, path: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let doc = inner
            .collections
            .entry(path.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (key, value) in fields {
            doc.insert(key, value);
        }
        inner.notify(path);
        Ok(())
    }

    async fn create(&self, path: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .collections
            .entry(path.to_string())
            .or_default()
            .insert(id.clone(), fields);
        inner.notify(path);
        Ok(id)
    }

    async fn delete(&self, path: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let removed = inner
            .collections
            .get_mut(path)
            .and_then(|coll| coll.remove(id));
        if removed.is_some() {
            inner.notify(path);
        }
        Ok(())
    }

    fn subscribe(&self, path: &str) -> SnapshotFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.inner.write() {
            Ok(mut inner) => {
                // Initial delivery mirrors the hosted feed: the current
                // contents arrive before any mutation is observed.
                let _ = tx.send(inner.snapshot(path));
                inner.watchers.entry(path.to_string()).or_default().push(tx);
            }
            Err(_) => tracing::error!(path, "store lock poisoned, feed starts empty"),
        }
        SnapshotFeed::new(rx)
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}
