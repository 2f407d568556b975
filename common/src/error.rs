use crate::request::RequestStatus;
use crate::store::StoreError;
use thiserror::Error;

/// Failure taxonomy for every coordination operation.
///
/// Validation and authorization variants are user-displayable as-is;
/// `Storage` is the only retryable variant (the whole operation can be
/// re-run, request creation re-runs duplicate detection on retry).
#[derive(Error, Debug)]
pub enum HearthError {
    #[error("invalid code: {0}")]
    InvalidCode(String),

    #[error("you cannot add yourself as a friend")]
    SelfRequest,

    #[error("you are already friends with {0}")]
    AlreadyFriends(String),

    #[error("you are already a member of {0}")]
    AlreadyMember(String),

    #[error("a pending request already exists")]
    DuplicateRequest,

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("request {id} was already {status}")]
    AlreadyResolved { id: String, status: RequestStatus },

    #[error("only the room owner can remove members")]
    NotAuthorized,

    #[error("the room owner cannot leave the room")]
    OwnerCannotLeave,

    #[error("the room owner cannot be removed")]
    CannotRemoveOwner,

    #[error("use leave to remove yourself from a room")]
    CannotRemoveSelf,

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("could not generate a unique code after {0} attempts")]
    CodeExhausted(usize),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl HearthError {
    /// Whether the caller may safely retry the whole operation.
    ///
    /// Union/removal semantics make every mutation idempotent, so only
    /// storage failures are worth retrying; everything else is a
    /// deterministic validation outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_not_retryable() {
        assert!(!HearthError::SelfRequest.is_retryable());
        assert!(!HearthError::DuplicateRequest.is_retryable());
        assert!(!HearthError::NotAuthorized.is_retryable());
    }

    #[test]
    fn storage_errors_are_retryable() {
        let err = HearthError::Storage(StoreError::Backend("unreachable".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn errors_display_a_user_message() {
        let err = HearthError::AlreadyFriends("Alice".to_string());
        assert_eq!(err.to_string(), "you are already friends with Alice");
    }
}
