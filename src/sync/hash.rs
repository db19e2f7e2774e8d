//! Content hashing for sync operations.
//!
//! Records are hashed over their serialized JSON so that import can tell an
//! unchanged record from an edited one without comparing every field.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::sync::types::SyncResult;

/// Compute a SHA256 hash of a serializable value.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized to JSON.
pub fn content_hash<T: Serialize>(value: &T) -> SyncResult<String> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check if a record has changed relative to a stored hash.
///
/// A missing stored hash counts as changed.
#[must_use]
pub fn has_changed(current_hash: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_none_or(|h| h != current_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sprint;

    fn sprint(name: &str) -> Sprint {
        let mut sprint = Sprint::new(
            "proj_1".into(),
            name.into(),
            "2025-03-01".into(),
            "2025-03-14".into(),
        );
        sprint.id = "sprint_1".into();
        sprint.created_at = 1000;
        sprint.updated_at = 1000;
        sprint
    }

    #[test]
    fn test_content_hash_deterministic() {
        let hash1 = content_hash(&sprint("Sprint 1")).unwrap();
        let hash2 = content_hash(&sprint("Sprint 1")).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let hash1 = content_hash(&sprint("Sprint 1")).unwrap();
        let hash2 = content_hash(&sprint("Sprint 2")).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_has_changed() {
        assert!(has_changed("abc123", None));
        assert!(has_changed("abc123", Some("xyz789")));
        assert!(!has_changed("abc123", Some("abc123")));
    }
}
