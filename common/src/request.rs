use crate::room::RoomId;
use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RequestId = String;

/// Lifecycle state of a friend or join request.
///
/// Requests are created `Pending` and transition exactly once to
/// `Accepted` or `Rejected`; terminal states never reopen. A rejected
/// request does not block a later re-send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A friend request from `sender_id` to `receiver_id`.
///
/// At most one pending request exists per ordered (sender, receiver)
/// pair. Names and emails are denormalized so observers can render the
/// request without extra lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: RequestId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_email: String,
    pub receiver_id: UserId,
    pub receiver_name: String,
    pub receiver_email: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A request by `user_id` to join `room_id`.
///
/// At most one pending request exists per (user, room) pair. `owner_id`
/// is denormalized so the room owner's pending queue is a single
/// equality query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub room_id: RoomId,
    pub room_name: String,
    pub owner_id: UserId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
