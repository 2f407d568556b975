use crate::store::{Collection, DocumentStore, Filter, StoreError, WriteOp};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// In-memory document store.
///
/// Backs the core test suites and embedders that do not need
/// persistence. Batch atomicity comes from holding the write lock for
/// the whole commit; change events are sent after the lock is
/// released so subscribers always re-read the committed state.
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
    events: broadcast::Sender<Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn emit(&self, collections: &[Collection]) {
        let mut seen = Vec::new();
        for collection in collections {
            if !seen.contains(collection) {
                seen.push(*collection);
                // No subscribers is fine.
                let _ = self.events.send(*collection);
            }
        }
    }

    fn merge_fields(doc: &mut Value, fields: &Map<String, Value>) -> Result<(), StoreError> {
        let object = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Backend("document is not an object".to_string()))?;
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().unwrap();
        let Some(docs) = collections.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .cloned()
            .collect())
    }

    async fn put(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().unwrap();
            collections
                .entry(collection)
                .or_default()
                .insert(id.to_string(), doc);
        }
        self.emit(&[collection]);
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Update {
            collection,
            id: id.to_string(),
            fields,
        }])
        .await
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<(), StoreError> {
        let touched: Vec<Collection> = writes.iter().map(WriteOp::collection).collect();
        {
            let mut collections = self.collections.write().unwrap();

            // Validate every target first so a failing update leaves
            // the batch entirely unapplied.
            for write in &writes {
                if let WriteOp::Update { collection, id, .. } = write {
                    let doc = collections.get(collection).and_then(|docs| docs.get(id));
                    match doc {
                        None => {
                            return Err(StoreError::NotFound {
                                collection: *collection,
                                id: id.clone(),
                            })
                        }
                        Some(doc) if !doc.is_object() => {
                            return Err(StoreError::Backend(
                                "document is not an object".to_string(),
                            ))
                        }
                        Some(_) => {}
                    }
                }
            }

            for write in writes {
                match write {
                    WriteOp::Put {
                        collection,
                        id,
                        doc,
                    } => {
                        collections.entry(collection).or_default().insert(id, doc);
                    }
                    WriteOp::Update {
                        collection,
                        id,
                        fields,
                    } => {
                        let doc = collections
                            .get_mut(&collection)
                            .and_then(|docs| docs.get_mut(&id))
                            .expect("validated above");
                        Self::merge_fields(doc, &fields)?;
                    }
                }
            }
        }
        self.emit(&touched);
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<Collection> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryStore::new();
        store
            .put(Collection::Users, "u1", json!({"id": "u1", "friends": []}))
            .await
            .unwrap();

        let doc = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert_eq!(doc["id"], "u1");
        assert!(store
            .get(Collection::Users, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn query_applies_all_filters() {
        let store = MemoryStore::new();
        store
            .put(
                Collection::FriendRequests,
                "r1",
                json!({"receiverId": "u2", "status": "pending"}),
            )
            .await
            .unwrap();
        store
            .put(
                Collection::FriendRequests,
                "r2",
                json!({"receiverId": "u2", "status": "accepted"}),
            )
            .await
            .unwrap();

        let pending = store
            .query(
                Collection::FriendRequests,
                &[
                    Filter::eq("receiverId", "u2"),
                    Filter::eq("status", "pending"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["status"], "pending");
    }

    #[tokio::test]
    async fn failed_commit_applies_nothing() {
        let store = MemoryStore::new();
        store
            .put(Collection::Users, "u1", json!({"id": "u1", "friends": []}))
            .await
            .unwrap();

        let result = store
            .commit(vec![
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "u1".to_string(),
                    fields: fields(&[("friends", json!(["u2"]))]),
                },
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "missing".to_string(),
                    fields: fields(&[("friends", json!(["u1"]))]),
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        // First update must not have leaked through.
        let doc = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert_eq!(doc["friends"], json!([]));
    }

    #[tokio::test]
    async fn update_merges_fields_preserving_the_rest() {
        let store = MemoryStore::new();
        store
            .put(
                Collection::Rooms,
                "room1",
                json!({"id": "room1", "name": "Home", "emoji": "H"}),
            )
            .await
            .unwrap();

        store
            .update_fields(
                Collection::Rooms,
                "room1",
                fields(&[("name", json!("New Home"))]),
            )
            .await
            .unwrap();

        let doc = store.get(Collection::Rooms, "room1").await.unwrap().unwrap();
        assert_eq!(doc["name"], "New Home");
        assert_eq!(doc["emoji"], "H");
    }

    #[tokio::test]
    async fn writes_emit_touched_collections() {
        let store = MemoryStore::new();
        let mut rx = store.watch();

        store
            .put(Collection::Users, "u1", json!({"id": "u1"}))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), Collection::Users);

        store
            .commit(vec![WriteOp::Put {
                collection: Collection::Rooms,
                id: "room1".to_string(),
                doc: json!({"id": "room1"}),
            }])
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), Collection::Rooms);
    }

    #[tokio::test]
    async fn commit_emits_each_collection_once() {
        let store = MemoryStore::new();
        store
            .put(Collection::Users, "u1", json!({"id": "u1"}))
            .await
            .unwrap();
        store
            .put(Collection::Users, "u2", json!({"id": "u2"}))
            .await
            .unwrap();

        let mut rx = store.watch();
        store
            .commit(vec![
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "u1".to_string(),
                    fields: fields(&[("friends", json!(["u2"]))]),
                },
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "u2".to_string(),
                    fields: fields(&[("friends", json!(["u1"]))]),
                },
            ])
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), Collection::Users);
        assert!(rx.try_recv().is_err());
    }
}
