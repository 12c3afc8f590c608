use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

// ============================================================================
// Document Store Capability Interface
// ============================================================================
//
// The hosted document database is reached exclusively through this trait.
// Consumers take an `Arc<dyn DocumentStore>` so the backend can be swapped
// for the in-memory implementation in tests and the demo binary.
//
// ============================================================================

pub type Fields = serde_json::Map<String, Value>;

/// A schema-less document: store-assigned id plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDocument {
    pub id: String,
    pub fields: Fields,
}

impl StoreDocument {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }

    /// Decode the field map into a typed value. The id is not part of the
    /// field map; callers that need it set it on the decoded value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|source| {
            StoreError::Decode { id: self.id.clone(), source }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to decode document {id}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode fields")]
    Encode(#[source] serde_json::Error),

    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// Push feed over one collection. Yields the full current collection
/// contents immediately on subscription and again after every mutation;
/// there is no per-document diffing.
pub struct SnapshotFeed {
    rx: mpsc::UnboundedReceiver<Vec<StoreDocument>>,
}

impl SnapshotFeed {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Vec<StoreDocument>>) -> Self {
        Self { rx }
    }

    /// Next snapshot, or `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<Vec<StoreDocument>> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full collection scan.
    async fn list(&self, path: &str) -> Result<Vec<StoreDocument>, StoreError>;

    /// Equality query against a single field.
    async fn query(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoreDocument>, StoreError>;

    async fn get(&self, path: &str, id: &str) -> Result<Option<StoreDocument>, StoreError>;

    /// Partial field merge into an existing document, creating it when
    /// absent. Fields not named are left untouched.
    async fn put(&self, path: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Create with a store-assigned id; returns the id.
    async fn create(&self, path: &str, fields: Fields) -> Result<String, StoreError>;

    async fn delete(&self, path: &str, id: &str) -> Result<(), StoreError>;

    /// Subscribe to full-snapshot change notifications for one collection.
    fn subscribe(&self, path: &str) -> SnapshotFeed;
}
