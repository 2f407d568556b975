use crate::error::HearthError;
use crate::store::{Collection, DocumentStore, Filter};
use rand::Rng;

/// Alphabet shared by friend codes, invite codes and document ids.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a user's shareable friend code.
pub const FRIEND_CODE_LEN: usize = 8;

/// Length of a room's shareable invite code.
pub const INVITE_CODE_LEN: usize = 6;

/// Length of generated document ids (rooms).
pub const DOCUMENT_ID_LEN: usize = 20;

/// How many times code generation re-rolls on a detected collision
/// before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Generate a random code of `len` characters from [`CODE_ALPHABET`].
///
/// Uniqueness is enforced by checked lookup at the call site, not by
/// construction.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Draw codes until one is unused in `collection.field`, re-rolling on
/// collision up to [`MAX_CODE_ATTEMPTS`] times.
pub(crate) async fn unique_code(
    store: &dyn DocumentStore,
    collection: Collection,
    field: &str,
    len: usize,
) -> Result<String, HearthError> {
    for attempt in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code(len);
        let existing = store
            .query(collection, &[Filter::eq(field, code.clone())])
            .await?;
        if existing.is_empty() {
            return Ok(code);
        }
        tracing::warn!(%collection, field, attempt, "code collision, re-rolling");
    }
    Err(HearthError::CodeExhausted(MAX_CODE_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_requested_length() {
        assert_eq!(generate_code(FRIEND_CODE_LEN).len(), 8);
        assert_eq!(generate_code(INVITE_CODE_LEN).len(), 6);
        assert_eq!(generate_code(0).len(), 0);
    }

    #[test]
    fn codes_only_use_the_alphabet() {
        let code = generate_code(64);
        assert!(code
            .bytes()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn codes_are_not_constant() {
        // Two 20-char draws colliding would indicate a broken RNG.
        assert_ne!(generate_code(20), generate_code(20));
    }
}
