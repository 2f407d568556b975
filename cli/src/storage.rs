use anyhow::{anyhow, Result};
use async_trait::async_trait;
use directories::ProjectDirs;
use hearth_core::store::{Collection, DocumentStore, Filter, StoreError, WriteOp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Resolve the directory holding the store and config files. An
/// explicit argument wins, then the HEARTH_CONFIG_DIR environment
/// variable, then the platform data directory.
pub fn resolve_data_dir(config_dir: Option<&str>) -> Result<PathBuf> {
    let data_dir = if let Some(dir) = config_dir {
        PathBuf::from(dir)
    } else if let Ok(dir) = std::env::var("HEARTH_CONFIG_DIR") {
        PathBuf::from(dir)
    } else {
        let proj_dirs = ProjectDirs::from("", "Hearth", "Hearth")
            .ok_or_else(|| anyhow!("Failed to determine project directories"))?;
        proj_dirs.data_dir().to_path_buf()
    };

    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// On-disk layout of the document store. Collection names match the
/// wire names so a store file is readable as plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreFile {
    #[serde(default)]
    users: BTreeMap<String, Value>,
    #[serde(default)]
    rooms: BTreeMap<String, Value>,
    #[serde(default, rename = "friendRequests")]
    friend_requests: BTreeMap<String, Value>,
    #[serde(default, rename = "roomJoinRequests")]
    room_join_requests: BTreeMap<String, Value>,
}

impl StoreFile {
    fn collection(&self, collection: Collection) -> &BTreeMap<String, Value> {
        match collection {
            Collection::Users => &self.users,
            Collection::Rooms => &self.rooms,
            Collection::FriendRequests => &self.friend_requests,
            Collection::JoinRequests => &self.room_join_requests,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut BTreeMap<String, Value> {
        match collection {
            Collection::Users => &mut self.users,
            Collection::Rooms => &mut self.rooms,
            Collection::FriendRequests => &mut self.friend_requests,
            Collection::JoinRequests => &mut self.room_join_requests,
        }
    }
}

/// File-backed document store for the CLI.
///
/// Every operation is a full load-modify-save of one JSON file under
/// the data directory. The mutex serializes those cycles; the save is
/// a single write, so a batch lands entirely or not at all. It is
/// never held across an await.
pub struct JsonStore {
    storage_path: PathBuf,
    lock: Mutex<()>,
    events: broadcast::Sender<Collection>,
}

impl JsonStore {
    pub fn new(config_dir: Option<&str>) -> Result<Self> {
        let data_dir = resolve_data_dir(config_dir)?;
        let storage_path = data_dir.join("store.json");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            storage_path,
            lock: Mutex::new(()),
            events,
        })
    }

    fn load(&self) -> Result<StoreFile, StoreError> {
        if !self.storage_path.exists() {
            return Ok(StoreFile::default());
        }

        let contents = fs::read_to_string(&self.storage_path)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(file)?;
        fs::write(&self.storage_path, contents).map_err(|e| StoreError::Backend(e.to_string()))
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

    fn mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.storage_path)
            .and_then(|m| m.modified())
            .ok()
    }

    /// In-process writes emit change events directly; writes from other
    /// processes only show up on disk. Poll the file's mtime and emit a
    /// blanket event when it moves. Subscribers re-query and suppress
    /// unchanged snapshots, so over-notifying is harmless.
    pub fn spawn_mtime_poll(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut last = store.mtime();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let current = store.mtime();
                if current != last {
                    last = current;
                    store.emit(&[
                        Collection::Users,
                        Collection::Rooms,
                        Collection::FriendRequests,
                        Collection::JoinRequests,
                    ]);
                }
            }
        })
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

#[async_trait]
impl DocumentStore for JsonStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        let file = self.load()?;
        Ok(file.collection(collection).get(id).cloned())
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        let _guard = self.lock.lock().unwrap();
        let file = self.load()?;
        Ok(file
            .collection(collection)
            .values()
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .cloned()
            .collect())
    }

    async fn put(&self, collection: Collection, id: &str, doc: Value) -> Result<(), StoreError> {
        {
            let _guard = self.lock.lock().unwrap();
            let mut file = self.load()?;
            file.collection_mut(collection).insert(id.to_string(), doc);
            self.save(&file)?;
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
            let _guard = self.lock.lock().unwrap();
            let mut file = self.load()?;

            // Validate every target first so a failing update leaves
            // the file untouched.
            for write in &writes {
                if let WriteOp::Update { collection, id, .. } = write {
                    match file.collection(*collection).get(id) {
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
                        file.collection_mut(collection).insert(id, doc);
                    }
                    WriteOp::Update {
                        collection,
                        id,
                        fields,
                    } => {
                        let doc = file
                            .collection_mut(collection)
                            .get_mut(&id)
                            .expect("validated above");
                        Self::merge_fields(doc, &fields)?;
                    }
                }
            }

            self.save(&file)?;
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
    use tempfile::TempDir;

    fn create_test_store() -> (JsonStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::new(Some(temp_dir.path().to_str().unwrap())).unwrap();
        (store, temp_dir)
    }

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn documents_survive_a_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_str().unwrap().to_string();

        {
            let store = JsonStore::new(Some(&dir)).unwrap();
            store
                .put(Collection::Users, "u1", json!({"id": "u1", "friends": []}))
                .await
                .unwrap();
        }

        let reopened = JsonStore::new(Some(&dir)).unwrap();
        let doc = reopened
            .get(Collection::Users, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["id"], "u1");
    }

    #[tokio::test]
    async fn query_filters_apply() {
        let (store, _temp_dir) = create_test_store();
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
                json!({"receiverId": "u2", "status": "rejected"}),
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
    async fn failed_commit_leaves_the_file_untouched() {
        let (store, _temp_dir) = create_test_store();
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
        let doc = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert_eq!(doc["friends"], json!([]));
    }

    #[tokio::test]
    async fn writes_emit_touched_collections() {
        let (store, _temp_dir) = create_test_store();
        let mut rx = store.watch();

        store
            .put(Collection::Rooms, "room1", json!({"id": "room1"}))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), Collection::Rooms);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let (store, _temp_dir) = create_test_store();
        assert!(store
            .get(Collection::Users, "u1")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .query(Collection::Rooms, &[])
            .await
            .unwrap()
            .is_empty());
    }
}
