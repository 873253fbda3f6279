//! Provider endpoints and credentials from the environment.

use secrecy::SecretString;

/// Provider credentials and service endpoints.
///
/// Secrets are wrapped in [`SecretString`] as soon as they leave the
/// environment; this struct intentionally has no `Debug` impl.
pub struct ProviderSettings {
    pub database_url: String,
    pub bind_addr: String,
    pub anthropic_api_key: Option<SecretString>,
    pub anthropic_model: String,
    pub serper_api_key: Option<SecretString>,
    pub assemblyai_api_key: Option<SecretString>,
    pub deepgram_api_key: Option<SecretString>,
    /// Raw `user_id:key,...` pairs for the static verifier.
    pub api_keys: String,
}

impl ProviderSettings {
    /// Read settings from the environment.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("REHEARSE_DATABASE_URL")
                .unwrap_or_else(|_| crate::store::default_database_url()),
            bind_addr: std::env::var("REHEARSE_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            anthropic_api_key: secret_var("ANTHROPIC_API_KEY"),
            anthropic_model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            serper_api_key: secret_var("SERPER_API_KEY"),
            assemblyai_api_key: secret_var("ASSEMBLYAI_API_KEY"),
            deepgram_api_key: secret_var("DEEPGRAM_API_KEY"),
            api_keys: std::env::var("REHEARSE_API_KEYS").unwrap_or_default(),
        }
    }
}

fn secret_var(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}
