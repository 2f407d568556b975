use crate::directory::IdentityDirectory;
use crate::error::HearthError;
use crate::ledger::RequestLedger;
use crate::registry::RoomRegistry;
use crate::request::{FriendRequest, RequestStatus, RoomJoinRequest};
use crate::store::{Collection, DocumentStore, WriteOp};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates the request/accept workflows and every mutation of the
/// shared `friends`, `rooms` and `members` sets.
///
/// All validation happens before any write; the only mutation each
/// operation performs is a single atomic batch, so no observer can see
/// a request marked accepted without the membership lists updated, or
/// the reverse. Set-union and set-removal semantics (never blind
/// overwrite of unrelated fields, never duplicate entries) make every
/// operation safe to retry after a storage failure.
#[derive(Clone)]
pub struct MembershipCoordinator {
    store: Arc<dyn DocumentStore>,
    directory: IdentityDirectory,
    registry: RoomRegistry,
    ledger: RequestLedger,
}

impl MembershipCoordinator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let directory = IdentityDirectory::new(store.clone());
        let registry = RoomRegistry::new(store.clone());
        let ledger = RequestLedger::new(store.clone());
        Self {
            store,
            directory,
            registry,
            ledger,
        }
    }

    pub fn directory(&self) -> &IdentityDirectory {
        &self.directory
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    /// Send a friend request to the holder of `receiver_code`.
    pub async fn send_friend_request(
        &self,
        sender_id: &str,
        receiver_code: &str,
    ) -> Result<FriendRequest, HearthError> {
        let sender = self.directory.require_user(sender_id).await?;
        self.ledger
            .create_friend_request(&sender, receiver_code)
            .await
    }

    /// Send a join request for the room behind `invite_code`.
    pub async fn send_join_request(
        &self,
        user_id: &str,
        invite_code: &str,
    ) -> Result<RoomJoinRequest, HearthError> {
        let user = self.directory.require_user(user_id).await?;
        self.ledger
            .create_room_join_request(&user, invite_code)
            .await
    }

    /// Accept a pending friend request: atomically mark it accepted and
    /// add each user to the other's friends list.
    pub async fn accept_friend_request(&self, request_id: &str) -> Result<(), HearthError> {
        let request = self.ledger.get_friend_request(request_id).await?;
        if let Some(result) = Self::resolution_guard(&request.id, request.status, RequestStatus::Accepted) {
            return result;
        }

        let sender = self.directory.require_user(&request.sender_id).await?;
        let receiver = self.directory.require_user(&request.receiver_id).await?;

        let writes = vec![
            RequestLedger::set_status_op(
                Collection::FriendRequests,
                request_id,
                RequestStatus::Accepted,
            ),
            Self::set_op(
                Collection::Users,
                &sender.id,
                "friends",
                union(sender.friends, &receiver.id),
            ),
            Self::set_op(
                Collection::Users,
                &receiver.id,
                "friends",
                union(receiver.friends, &sender.id),
            ),
        ];
        self.store.commit(writes).await?;
        info!(request_id, sender_id = %sender.id, receiver_id = %receiver.id, "friend request accepted");
        Ok(())
    }

    /// Reject a pending friend request. No membership change.
    pub async fn reject_friend_request(&self, request_id: &str) -> Result<(), HearthError> {
        let request = self.ledger.get_friend_request(request_id).await?;
        if let Some(result) = Self::resolution_guard(&request.id, request.status, RequestStatus::Rejected) {
            return result;
        }

        self.store
            .commit(vec![RequestLedger::set_status_op(
                Collection::FriendRequests,
                request_id,
                RequestStatus::Rejected,
            )])
            .await?;
        info!(request_id, "friend request rejected");
        Ok(())
    }

    /// Accept a pending join request: atomically mark it accepted, add
    /// the user to the room's members and the room to the user's rooms.
    pub async fn accept_join_request(&self, request_id: &str) -> Result<(), HearthError> {
        let request = self.ledger.get_join_request(request_id).await?;
        if let Some(result) = Self::resolution_guard(&request.id, request.status, RequestStatus::Accepted) {
            return result;
        }

        let room = self.registry.require_room(&request.room_id).await?;
        let user = self.directory.require_user(&request.user_id).await?;

        let writes = vec![
            RequestLedger::set_status_op(
                Collection::JoinRequests,
                request_id,
                RequestStatus::Accepted,
            ),
            Self::set_op(
                Collection::Rooms,
                &room.id,
                "members",
                union(room.members, &user.id),
            ),
            Self::set_op(Collection::Users, &user.id, "rooms", union(user.rooms, &room.id)),
        ];
        self.store.commit(writes).await?;
        info!(request_id, room_id = %room.id, user_id = %user.id, "join request accepted");
        Ok(())
    }

    /// Reject a pending join request. No membership change.
    pub async fn reject_join_request(&self, request_id: &str) -> Result<(), HearthError> {
        let request = self.ledger.get_join_request(request_id).await?;
        if let Some(result) = Self::resolution_guard(&request.id, request.status, RequestStatus::Rejected) {
            return result;
        }

        self.store
            .commit(vec![RequestLedger::set_status_op(
                Collection::JoinRequests,
                request_id,
                RequestStatus::Rejected,
            )])
            .await?;
        info!(request_id, "join request rejected");
        Ok(())
    }

    /// Leave a room. The owner can never leave their own room.
    pub async fn leave_room(&self, user_id: &str, room_id: &str) -> Result<(), HearthError> {
        let room = self.registry.require_room(room_id).await?;
        if room.is_owner(user_id) {
            return Err(HearthError::OwnerCannotLeave);
        }
        self.remove_membership(&room.id, user_id).await?;
        info!(room_id, user_id, "user left room");
        Ok(())
    }

    /// Remove `target_user_id` from a room on behalf of
    /// `acting_user_id`. Only the owner may kick; the owner cannot be
    /// kicked; kicking yourself is leaving, not kicking.
    pub async fn remove_member(
        &self,
        room_id: &str,
        target_user_id: &str,
        acting_user_id: &str,
    ) -> Result<(), HearthError> {
        let room = self.registry.require_room(room_id).await?;
        if !room.is_owner(acting_user_id) {
            return Err(HearthError::NotAuthorized);
        }
        if room.is_owner(target_user_id) {
            return Err(HearthError::CannotRemoveOwner);
        }
        if target_user_id == acting_user_id {
            return Err(HearthError::CannotRemoveSelf);
        }
        self.remove_membership(room_id, target_user_id).await?;
        info!(room_id, target_user_id, acting_user_id, "member removed from room");
        Ok(())
    }

    /// Atomically remove a user from a room's member list and the room
    /// from the user's room list. Removal of an absent element is a
    /// no-op write, which keeps retries safe.
    async fn remove_membership(&self, room_id: &str, user_id: &str) -> Result<(), HearthError> {
        let room = self.registry.require_room(room_id).await?;
        let user = self.directory.require_user(user_id).await?;

        let writes = vec![
            Self::set_op(
                Collection::Rooms,
                &room.id,
                "members",
                removed(room.members, user_id),
            ),
            Self::set_op(
                Collection::Users,
                &user.id,
                "rooms",
                removed(user.rooms, room_id),
            ),
        ];
        self.store.commit(writes).await?;
        Ok(())
    }

    /// Re-resolving a request in the same terminal state is an
    /// idempotent no-op (retries after a lost ack land here); resolving
    /// it in the opposite terminal state is an error.
    fn resolution_guard(
        request_id: &str,
        current: RequestStatus,
        wanted: RequestStatus,
    ) -> Option<Result<(), HearthError>> {
        if !current.is_terminal() {
            return None;
        }
        if current == wanted {
            debug!(request_id, status = %current, "request already resolved, no-op");
            Some(Ok(()))
        } else {
            Some(Err(HearthError::AlreadyResolved {
                id: request_id.to_string(),
                status: current,
            }))
        }
    }

    fn set_op(collection: Collection, id: &str, field: &str, values: Vec<String>) -> WriteOp {
        let mut fields = serde_json::Map::new();
        fields.insert(field.to_string(), json!(values));
        fields.insert("updatedAt".to_string(), json!(Utc::now()));
        WriteOp::Update {
            collection,
            id: id.to_string(),
            fields,
        }
    }
}

fn union(mut values: Vec<String>, id: &str) -> Vec<String> {
    if !values.iter().any(|v| v == id) {
        values.push(id.to_string());
    }
    values
}

fn removed(mut values: Vec<String>, id: &str) -> Vec<String> {
    values.retain(|v| v != id);
    values
}
