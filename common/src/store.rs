pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

pub use memory::MemoryStore;

/// The document collections the core operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Rooms,
    FriendRequests,
    JoinRequests,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Rooms => "rooms",
            Collection::FriendRequests => "friendRequests",
            Collection::JoinRequests => "roomJoinRequests",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A query filter evaluated against a stored document.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Field equals value.
    Eq(String, Value),
    /// Field is an array containing value.
    Contains(String, Value),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Contains(field.into(), value.into())
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::Contains(field, value) => doc
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
        }
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Replace (or create) the whole document.
    Put {
        collection: Collection,
        id: String,
        doc: Value,
    },
    /// Merge the given fields into an existing document.
    Update {
        collection: Collection,
        id: String,
        fields: Map<String, Value>,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Put { collection, .. } => *collection,
            WriteOp::Update { collection, .. } => *collection,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// The minimum contract the coordination core requires from a backing
/// document store.
///
/// Implementations must make `commit` all-or-nothing: no other
/// operation may observe a state where only part of the batch has been
/// applied. Every successful write emits the touched collections on
/// the channel returned by `watch`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError>;

    async fn put(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError>;

    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Apply every write as one atomic unit.
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Change feed: one event per collection touched by a write.
    fn watch(&self) -> broadcast::Receiver<Collection>;
}
