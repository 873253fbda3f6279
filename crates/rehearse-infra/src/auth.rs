//! Static API-key verifier.
//!
//! Accepted keys are configured as `user_id:key` pairs; the key portion
//! is SHA-256 hashed at startup and bearer tokens are hashed and compared
//! at request time, so plaintext keys never sit in memory longer than
//! parsing. A missing credential is anonymous, not an error.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use rehearse_core::clients::AuthVerifier;
use rehearse_types::auth::AuthOutcome;

/// Verifier over a fixed set of hashed API keys.
pub struct StaticKeyVerifier {
    /// key-hash (lowercase hex) → user id.
    keys: HashMap<String, String>,
}

impl StaticKeyVerifier {
    /// Parse a `user_id:key,user_id:key` configuration string. Malformed
    /// entries are skipped with a warning.
    pub fn from_config(raw: &str) -> Self {
        let mut keys = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once(':') {
                Some((user_id, key)) if !user_id.is_empty() && !key.is_empty() => {
                    keys.insert(hash_key(key), user_id.to_string());
                }
                _ => {
                    tracing::warn!("skipping malformed api key entry");
                }
            }
        }
        Self { keys }
    }

    /// Number of accepted keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

/// SHA-256 of a key as lowercase hex.
fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{digest:x}")
}

impl AuthVerifier for StaticKeyVerifier {
    async fn verify(&self, token: Option<&str>) -> AuthOutcome {
        let Some(token) = token else {
            return AuthOutcome::Anonymous;
        };
        let token = token.trim();
        if token.is_empty() {
            return AuthOutcome::Anonymous;
        }
        match self.keys.get(&hash_key(token)) {
            Some(user_id) => AuthOutcome::User {
                user_id: user_id.clone(),
            },
            None => AuthOutcome::Invalid,
        }
    }
}
