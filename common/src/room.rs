use crate::error::HearthError;
use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RoomId = String;

/// A shared workspace grouping member users under one owner.
///
/// `members` carries set semantics and always contains `owner_id`;
/// only the membership coordinator may mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub emoji: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: UserId,
    pub invite_code: String,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// Partial update of a room's display fields.
///
/// Membership and ownership are excluded: the member list is mutated
/// only through coordinator commits, and rooms do not change owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub description: Option<Option<String>>,
}

impl RoomPatch {
    pub fn into_fields(self) -> Result<Map<String, Value>, HearthError> {
        let mut fields = Map::new();
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err(HearthError::InvalidPatch("name cannot be empty".to_string()));
            }
            fields.insert("name".to_string(), Value::String(name));
        }
        if let Some(emoji) = self.emoji {
            fields.insert("emoji".to_string(), Value::String(emoji));
        }
        if let Some(description) = self.description {
            fields.insert(
                "description".to_string(),
                description.map(Value::String).unwrap_or(Value::Null),
            );
        }
        if fields.is_empty() {
            return Err(HearthError::InvalidPatch("empty patch".to_string()));
        }
        Ok(fields)
    }
}
