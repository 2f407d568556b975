use crate::error::HearthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type UserId = String;

/// A user record.
///
/// `friends` and `rooms` carry set semantics (no duplicates) and are
/// owned by this record; only the membership coordinator may mutate
/// them. Field names follow the stored document format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub friend_code: String,
    pub friends: Vec<UserId>,
    pub rooms: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile supplied by the identity provider on session establishment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Partial update of a user's profile fields.
///
/// Friend and room lists are deliberately absent: those sets are only
/// mutated through coordinator commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<Option<String>>,
}

impl UserPatch {
    /// Validate and convert into the field map merged into the stored
    /// document. Fails on an empty patch or empty required values.
    pub fn into_fields(self) -> Result<Map<String, Value>, HearthError> {
        let mut fields = Map::new();
        if let Some(email) = self.email {
            if email.trim().is_empty() {
                return Err(HearthError::InvalidPatch("email cannot be empty".to_string()));
            }
            fields.insert("email".to_string(), Value::String(email));
        }
        if let Some(display_name) = self.display_name {
            if display_name.trim().is_empty() {
                return Err(HearthError::InvalidPatch(
                    "display name cannot be empty".to_string(),
                ));
            }
            fields.insert("displayName".to_string(), Value::String(display_name));
        }
        if let Some(photo_url) = self.photo_url {
            fields.insert(
                "photoUrl".to_string(),
                photo_url.map(Value::String).unwrap_or(Value::Null),
            );
        }
        if fields.is_empty() {
            return Err(HearthError::InvalidPatch("empty patch".to_string()));
        }
        Ok(fields)
    }
}
