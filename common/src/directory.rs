use crate::code::{self, FRIEND_CODE_LEN};
use crate::error::HearthError;
use crate::store::{Collection, DocumentStore, Filter, StoreError};
use crate::user::{User, UserPatch, UserProfile};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Lookup and lifecycle of user records.
#[derive(Clone)]
pub struct IdentityDirectory {
    store: Arc<dyn DocumentStore>,
}

impl IdentityDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, HearthError> {
        match self.store.get(Collection::Users, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    /// Like [`get_user`](Self::get_user) but absence is an error.
    pub async fn require_user(&self, id: &str) -> Result<User, HearthError> {
        self.get_user(id)
            .await?
            .ok_or_else(|| HearthError::UserNotFound(id.to_string()))
    }

    pub async fn get_user_by_friend_code(
        &self,
        friend_code: &str,
    ) -> Result<Option<User>, HearthError> {
        let docs = self
            .store
            .query(
                Collection::Users,
                &[Filter::eq("friendCode", friend_code)],
            )
            .await?;
        match docs.into_iter().next() {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    /// Create a user record with a fresh unique friend code and empty
    /// friend/room lists. Fails if the id is already taken.
    pub async fn create_user(&self, profile: UserProfile) -> Result<User, HearthError> {
        if self.get_user(&profile.id).await?.is_some() {
            return Err(HearthError::UserExists(profile.id));
        }

        let friend_code = code::unique_code(
            self.store.as_ref(),
            Collection::Users,
            "friendCode",
            FRIEND_CODE_LEN,
        )
        .await?;

        let now = Utc::now();
        let user = User {
            id: profile.id,
            email: profile.email,
            display_name: profile.display_name,
            photo_url: profile.photo_url,
            friend_code,
            friends: Vec::new(),
            rooms: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .put(
                Collection::Users,
                &user.id,
                serde_json::to_value(&user).map_err(StoreError::from)?,
            )
            .await?;
        info!(user_id = %user.id, "created user");
        Ok(user)
    }

    /// Identity-provider integration point: return the existing record
    /// for this id, creating it on first sight. A concurrent creation
    /// race resolves to whichever record landed first.
    pub async fn ensure_user(&self, profile: UserProfile) -> Result<User, HearthError> {
        if let Some(user) = self.get_user(&profile.id).await? {
            debug!(user_id = %user.id, "user already provisioned");
            return Ok(user);
        }
        let id = profile.id.clone();
        match self.create_user(profile).await {
            Ok(user) => Ok(user),
            // Lost the creation race; the record now exists.
            Err(HearthError::UserExists(_)) => self.require_user(&id).await,
            Err(e) => Err(e),
        }
    }

    /// Merge profile fields into an existing user and bump `updatedAt`.
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<(), HearthError> {
        let mut fields = patch.into_fields()?;
        fields.insert("updatedAt".to_string(), json!(Utc::now()));
        match self.store.update_fields(Collection::Users, id, fields).await {
            Err(StoreError::NotFound { .. }) => Err(HearthError::UserNotFound(id.to_string())),
            other => Ok(other?),
        }
    }
}
