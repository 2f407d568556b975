use hearth_core::{MembershipCoordinator, NewRoom, UserProfile};
use hearthctl::storage::JsonStore;
use std::sync::Arc;
use tempfile::TempDir;

fn profile(id: &str, name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        display_name: name.to_string(),
        photo_url: None,
    }
}

fn coordinator(dir: &str) -> MembershipCoordinator {
    let store = Arc::new(JsonStore::new(Some(dir)).unwrap());
    MembershipCoordinator::new(store)
}

#[tokio::test]
async fn membership_flows_persist_across_store_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap().to_string();

    // First session: two users become friends.
    {
        let coordinator = coordinator(&dir);
        coordinator
            .directory()
            .create_user(profile("u1", "Alice"))
            .await
            .unwrap();
        let bob = coordinator
            .directory()
            .create_user(profile("u2", "Bob"))
            .await
            .unwrap();

        let request = coordinator
            .send_friend_request("u1", &bob.friend_code)
            .await
            .unwrap();
        coordinator
            .accept_friend_request(&request.id)
            .await
            .unwrap();
    }

    // Second session, fresh store handle on the same directory.
    let coordinator = coordinator(&dir);
    let alice = coordinator.directory().require_user("u1").await.unwrap();
    assert_eq!(alice.friends, vec!["u2".to_string()]);

    let room = coordinator
        .registry()
        .create_room(NewRoom {
            name: "Home".to_string(),
            emoji: "\u{1F3E0}".to_string(),
            owner_id: "u1".to_string(),
            description: None,
        })
        .await
        .unwrap();
    let request = coordinator
        .send_join_request("u2", &room.invite_code)
        .await
        .unwrap();
    coordinator.accept_join_request(&request.id).await.unwrap();

    // Third session sees the committed membership.
    let coordinator = self::coordinator(&dir);
    let joined = coordinator.registry().require_room(&room.id).await.unwrap();
    assert_eq!(joined.members, vec!["u1".to_string(), "u2".to_string()]);
    let bob = coordinator.directory().require_user("u2").await.unwrap();
    assert!(bob.rooms.contains(&room.id));
}

#[tokio::test]
async fn failed_batch_is_invisible_after_reopen() {
    use hearth_core::store::{Collection, DocumentStore, StoreError, WriteOp};
    use serde_json::json;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap().to_string();

    {
        let store = JsonStore::new(Some(&dir)).unwrap();
        store
            .put(Collection::Users, "u1", json!({"id": "u1", "friends": []}))
            .await
            .unwrap();

        let mut fields = serde_json::Map::new();
        fields.insert("friends".to_string(), json!(["u2"]));
        let result = store
            .commit(vec![
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "u1".to_string(),
                    fields: fields.clone(),
                },
                WriteOp::Update {
                    collection: Collection::Users,
                    id: "missing".to_string(),
                    fields,
                },
            ])
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    let reopened = JsonStore::new(Some(&dir)).unwrap();
    let doc = reopened
        .get(Collection::Users, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["friends"], json!([]));
}
