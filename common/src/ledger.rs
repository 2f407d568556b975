use crate::directory::IdentityDirectory;
use crate::error::HearthError;
use crate::registry::RoomRegistry;
use crate::request::{FriendRequest, RequestStatus, RoomJoinRequest};
use crate::store::{Collection, DocumentStore, Filter, StoreError, WriteOp};
use crate::user::User;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Store of pending/accepted/rejected friend and room-join requests.
///
/// Requests are never deleted; duplicate detection only considers
/// pending entries, so a rejected request does not block a re-send.
/// The pending-lookup-then-write window is a known benign race: two
/// concurrent senders can each create a pending entry, but both can be
/// accepted safely because membership updates are set unions.
#[derive(Clone)]
pub struct RequestLedger {
    store: Arc<dyn DocumentStore>,
    directory: IdentityDirectory,
    registry: RoomRegistry,
}

impl RequestLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let directory = IdentityDirectory::new(store.clone());
        let registry = RoomRegistry::new(store.clone());
        Self {
            store,
            directory,
            registry,
        }
    }

    /// Create a pending friend request from `sender` to the holder of
    /// `receiver_code`. Validation happens before any write.
    pub async fn create_friend_request(
        &self,
        sender: &User,
        receiver_code: &str,
    ) -> Result<FriendRequest, HearthError> {
        let receiver = self
            .directory
            .get_user_by_friend_code(receiver_code)
            .await?
            .ok_or_else(|| HearthError::InvalidCode(receiver_code.to_string()))?;

        if receiver.id == sender.id {
            return Err(HearthError::SelfRequest);
        }
        if receiver.friends.iter().any(|f| f == &sender.id) {
            return Err(HearthError::AlreadyFriends(receiver.display_name));
        }

        let existing = self
            .store
            .query(
                Collection::FriendRequests,
                &[
                    Filter::eq("senderId", sender.id.clone()),
                    Filter::eq("receiverId", receiver.id.clone()),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ],
            )
            .await?;
        if !existing.is_empty() {
            return Err(HearthError::DuplicateRequest);
        }

        let now = Utc::now();
        let request = FriendRequest {
            id: format!("{}_{}_{}", sender.id, receiver.id, now.timestamp_millis()),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            sender_email: sender.email.clone(),
            receiver_id: receiver.id,
            receiver_name: receiver.display_name,
            receiver_email: receiver.email,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.store
            .put(
                Collection::FriendRequests,
                &request.id,
                serde_json::to_value(&request).map_err(StoreError::from)?,
            )
            .await?;
        info!(request_id = %request.id, "created friend request");
        Ok(request)
    }

    /// Create a pending join request from `user` to the room behind
    /// `invite_code`.
    pub async fn create_room_join_request(
        &self,
        user: &User,
        invite_code: &str,
    ) -> Result<RoomJoinRequest, HearthError> {
        let room = self
            .registry
            .get_room_by_invite_code(invite_code)
            .await?
            .ok_or_else(|| HearthError::InvalidCode(invite_code.to_string()))?;

        if room.is_member(&user.id) {
            return Err(HearthError::AlreadyMember(room.name));
        }

        let existing = self
            .store
            .query(
                Collection::JoinRequests,
                &[
                    Filter::eq("userId", user.id.clone()),
                    Filter::eq("roomId", room.id.clone()),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ],
            )
            .await?;
        if !existing.is_empty() {
            return Err(HearthError::DuplicateRequest);
        }

        let now = Utc::now();
        let request = RoomJoinRequest {
            id: format!("{}_{}_{}", user.id, room.id, now.timestamp_millis()),
            user_id: user.id.clone(),
            user_name: user.display_name.clone(),
            user_email: user.email.clone(),
            room_id: room.id,
            room_name: room.name,
            owner_id: room.owner_id,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.store
            .put(
                Collection::JoinRequests,
                &request.id,
                serde_json::to_value(&request).map_err(StoreError::from)?,
            )
            .await?;
        info!(request_id = %request.id, "created room join request");
        Ok(request)
    }

    pub async fn get_friend_request(&self, id: &str) -> Result<FriendRequest, HearthError> {
        match self.store.get(Collection::FriendRequests, id).await? {
            Some(doc) => Ok(serde_json::from_value(doc).map_err(StoreError::from)?),
            None => Err(HearthError::RequestNotFound(id.to_string())),
        }
    }

    pub async fn get_join_request(&self, id: &str) -> Result<RoomJoinRequest, HearthError> {
        match self.store.get(Collection::JoinRequests, id).await? {
            Some(doc) => Ok(serde_json::from_value(doc).map_err(StoreError::from)?),
            None => Err(HearthError::RequestNotFound(id.to_string())),
        }
    }

    /// Pending friend requests addressed to `receiver_id`, newest first.
    pub async fn pending_friend_requests(
        &self,
        receiver_id: &str,
    ) -> Result<Vec<FriendRequest>, HearthError> {
        let docs = self
            .store
            .query(
                Collection::FriendRequests,
                &[
                    Filter::eq("receiverId", receiver_id),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ],
            )
            .await?;
        let mut requests = docs
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect::<Result<Vec<FriendRequest>, _>>()?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Pending join requests for rooms owned by `owner_id`, newest first.
    pub async fn pending_join_requests(
        &self,
        owner_id: &str,
    ) -> Result<Vec<RoomJoinRequest>, HearthError> {
        let docs = self
            .store
            .query(
                Collection::JoinRequests,
                &[
                    Filter::eq("ownerId", owner_id),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ],
            )
            .await?;
        let mut requests = docs
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect::<Result<Vec<RoomJoinRequest>, _>>()?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Build the status-transition write for a request. Only the
    /// coordinator issues these, always from Pending to a terminal
    /// state, inside its atomic batch.
    pub(crate) fn set_status_op(
        collection: Collection,
        request_id: &str,
        status: RequestStatus,
    ) -> WriteOp {
        let mut fields = serde_json::Map::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(Utc::now()));
        WriteOp::Update {
            collection,
            id: request_id.to_string(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::user::UserProfile;

    struct Fixture {
        ledger: RequestLedger,
        directory: IdentityDirectory,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let directory = IdentityDirectory::new(store.clone());
        for id in ["u1", "u2"] {
            directory
                .create_user(UserProfile {
                    id: id.to_string(),
                    email: format!("{id}@example.com"),
                    display_name: id.to_uppercase(),
                    photo_url: None,
                })
                .await
                .unwrap();
        }
        Fixture {
            ledger: RequestLedger::new(store),
            directory,
        }
    }

    #[tokio::test]
    async fn friend_request_happy_path() {
        let fx = fixture().await;
        let sender = fx.directory.require_user("u1").await.unwrap();
        let receiver = fx.directory.require_user("u2").await.unwrap();

        let request = fx
            .ledger
            .create_friend_request(&sender, &receiver.friend_code)
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.sender_id, "u1");
        assert_eq!(request.receiver_id, "u2");

        let pending = fx.ledger.pending_friend_requests("u2").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, request.id);
    }

    #[tokio::test]
    async fn friend_request_rejects_invalid_code() {
        let fx = fixture().await;
        let sender = fx.directory.require_user("u1").await.unwrap();
        let err = fx
            .ledger
            .create_friend_request(&sender, "NOSUCHCD")
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::InvalidCode(_)));
    }

    #[tokio::test]
    async fn friend_request_rejects_self() {
        let fx = fixture().await;
        let sender = fx.directory.require_user("u1").await.unwrap();
        let err = fx
            .ledger
            .create_friend_request(&sender, &sender.friend_code)
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::SelfRequest));

        // Nothing was persisted.
        assert!(fx
            .ledger
            .pending_friend_requests("u1")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_pending_friend_request_is_rejected() {
        let fx = fixture().await;
        let sender = fx.directory.require_user("u1").await.unwrap();
        let receiver = fx.directory.require_user("u2").await.unwrap();

        fx.ledger
            .create_friend_request(&sender, &receiver.friend_code)
            .await
            .unwrap();
        let err = fx
            .ledger
            .create_friend_request(&sender, &receiver.friend_code)
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::DuplicateRequest));

        let pending = fx.ledger.pending_friend_requests("u2").await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_request_fails() {
        let fx = fixture().await;
        assert!(matches!(
            fx.ledger.get_friend_request("ghost").await.unwrap_err(),
            HearthError::RequestNotFound(_)
        ));
        assert!(matches!(
            fx.ledger.get_join_request("ghost").await.unwrap_err(),
            HearthError::RequestNotFound(_)
        ));
    }
}
