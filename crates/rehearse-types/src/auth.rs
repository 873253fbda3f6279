//! Authentication outcome vocabulary.
//!
//! Session endpoints accept anonymous callers; a present-but-invalid
//! credential is rejected. The concrete verifier lives in rehearse-infra.

use serde::{Deserialize, Serialize};

/// Result of verifying a caller credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthOutcome {
    /// Verified credential bound to a user id.
    User { user_id: String },
    /// No credential supplied.
    Anonymous,
    /// Credential supplied but invalid or expired.
    Invalid,
}

impl AuthOutcome {
    /// The owner id to bind to created sessions, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthOutcome::User { user_id } => Some(user_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accessor() {
        let user = AuthOutcome::User {
            user_id: "u-123".to_string(),
        };
        assert_eq!(user.user_id(), Some("u-123"));
        assert_eq!(AuthOutcome::Anonymous.user_id(), None);
        assert_eq!(AuthOutcome::Invalid.user_id(), None);
    }
}
