use crate::code::{self, generate_code, DOCUMENT_ID_LEN, INVITE_CODE_LEN};
use crate::directory::IdentityDirectory;
use crate::error::HearthError;
use crate::room::{Room, RoomPatch};
use crate::store::{Collection, DocumentStore, Filter, StoreError};
use crate::user::UserId;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Parameters for creating a room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub emoji: String,
    pub owner_id: UserId,
    pub description: Option<String>,
}

/// Lookup and lifecycle of room records.
#[derive(Clone)]
pub struct RoomRegistry {
    store: Arc<dyn DocumentStore>,
    directory: IdentityDirectory,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let directory = IdentityDirectory::new(store.clone());
        Self { store, directory }
    }

    pub async fn get_room(&self, id: &str) -> Result<Option<Room>, HearthError> {
        match self.store.get(Collection::Rooms, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    /// Like [`get_room`](Self::get_room) but absence is an error.
    pub async fn require_room(&self, id: &str) -> Result<Room, HearthError> {
        self.get_room(id)
            .await?
            .ok_or_else(|| HearthError::RoomNotFound(id.to_string()))
    }

    pub async fn get_room_by_invite_code(
        &self,
        invite_code: &str,
    ) -> Result<Option<Room>, HearthError> {
        let docs = self
            .store
            .query(Collection::Rooms, &[Filter::eq("inviteCode", invite_code)])
            .await?;
        match docs.into_iter().next() {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    /// All rooms the user is a member of, newest first.
    pub async fn get_user_rooms(&self, user_id: &str) -> Result<Vec<Room>, HearthError> {
        let docs = self
            .store
            .query(Collection::Rooms, &[Filter::contains("members", user_id)])
            .await?;
        let mut rooms = docs
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect::<Result<Vec<Room>, _>>()?;
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    /// Create a room owned by `owner_id` with a fresh unique invite
    /// code and `members = {owner}`, then append the room to the
    /// owner's room list.
    ///
    /// The two writes need not be atomic: nothing can reference the
    /// room before this call returns, but both complete before it does.
    pub async fn create_room(&self, new_room: NewRoom) -> Result<Room, HearthError> {
        let owner = self.directory.require_user(&new_room.owner_id).await?;

        let invite_code = code::unique_code(
            self.store.as_ref(),
            Collection::Rooms,
            "inviteCode",
            INVITE_CODE_LEN,
        )
        .await?;

        let now = Utc::now();
        let room = Room {
            id: generate_code(DOCUMENT_ID_LEN),
            name: new_room.name,
            emoji: new_room.emoji,
            description: new_room.description,
            owner_id: owner.id.clone(),
            invite_code,
            members: vec![owner.id.clone()],
            created_at: now,
            updated_at: now,
        };

        self.store
            .put(
                Collection::Rooms,
                &room.id,
                serde_json::to_value(&room).map_err(StoreError::from)?,
            )
            .await?;

        let mut rooms = owner.rooms;
        if !rooms.contains(&room.id) {
            rooms.push(room.id.clone());
        }
        let mut fields = serde_json::Map::new();
        fields.insert("rooms".to_string(), json!(rooms));
        fields.insert("updatedAt".to_string(), json!(now));
        self.store
            .update_fields(Collection::Users, &owner.id, fields)
            .await?;

        info!(room_id = %room.id, owner_id = %owner.id, "created room");
        Ok(room)
    }

    /// Merge display fields into an existing room and bump `updatedAt`.
    pub async fn update_room(&self, id: &str, patch: RoomPatch) -> Result<(), HearthError> {
        let mut fields = patch.into_fields()?;
        fields.insert("updatedAt".to_string(), json!(Utc::now()));
        match self.store.update_fields(Collection::Rooms, id, fields).await {
            Err(StoreError::NotFound { .. }) => Err(HearthError::RoomNotFound(id.to_string())),
            other => Ok(other?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::user::UserProfile;

    async fn registry_with_owner() -> (RoomRegistry, IdentityDirectory) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let directory = IdentityDirectory::new(store.clone());
        directory
            .create_user(UserProfile {
                id: "owner".to_string(),
                email: "owner@example.com".to_string(),
                display_name: "Owner".to_string(),
                photo_url: None,
            })
            .await
            .unwrap();
        (RoomRegistry::new(store), directory)
    }

    fn new_room(name: &str) -> NewRoom {
        NewRoom {
            name: name.to_string(),
            emoji: "\u{1F3E0}".to_string(),
            owner_id: "owner".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn create_room_roundtrips_through_invite_code() {
        let (registry, directory) = registry_with_owner().await;
        let room = registry.create_room(new_room("Home")).await.unwrap();

        assert_eq!(room.invite_code.len(), INVITE_CODE_LEN);
        assert_eq!(room.members, vec!["owner".to_string()]);

        let found = registry
            .get_room_by_invite_code(&room.invite_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, room.id);
        assert_eq!(found.members, vec!["owner".to_string()]);

        // Owner's room list was appended before create_room returned.
        let owner = directory.require_user("owner").await.unwrap();
        assert_eq!(owner.rooms, vec![room.id]);
    }

    #[tokio::test]
    async fn create_room_requires_existing_owner() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let registry = RoomRegistry::new(store);
        let err = registry.create_room(new_room("Home")).await.unwrap_err();
        assert!(matches!(err, HearthError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn user_rooms_lists_memberships_newest_first() {
        let (registry, _) = registry_with_owner().await;
        let first = registry.create_room(new_room("First")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = registry.create_room(new_room("Second")).await.unwrap();

        let rooms = registry.get_user_rooms("owner").await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id, second.id);
        assert_eq!(rooms[1].id, first.id);

        assert!(registry.get_user_rooms("stranger").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_room_merges_fields() {
        let (registry, _) = registry_with_owner().await;
        let room = registry.create_room(new_room("Home")).await.unwrap();

        registry
            .update_room(
                &room.id,
                RoomPatch {
                    name: Some("New Home".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = registry.require_room(&room.id).await.unwrap();
        assert_eq!(updated.name, "New Home");
        assert_eq!(updated.invite_code, room.invite_code);
    }

    #[tokio::test]
    async fn update_unknown_room_fails() {
        let (registry, _) = registry_with_owner().await;
        let err = registry
            .update_room(
                "ghost",
                RoomPatch {
                    name: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::RoomNotFound(_)));
    }
}
