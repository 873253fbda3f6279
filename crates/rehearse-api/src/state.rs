//! Application state wiring the concrete infra implementations into the
//! generic core services.
//!
//! Core services are generic over the capability traits; this module pins
//! them to the SQLite store, the Anthropic LLM client, the Serper search
//! client, and the AssemblyAI/Deepgram speech clients.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use rehearse_core::registry::SessionRegistry;
use rehearse_core::service::SessionService;
use rehearse_core::speech::{SpeechService, StreamingTranscriptionCoordinator};
use rehearse_infra::auth::StaticKeyVerifier;
use rehearse_infra::config::ProviderSettings;
use rehearse_infra::llm::AnthropicClient;
use rehearse_infra::resume::PlainTextExtractor;
use rehearse_infra::search::SerperClient;
use rehearse_infra::speech::{AssemblyAiClient, DeepgramSynthesis, DeepgramTranscriber};
use rehearse_infra::store::{DatabasePool, SqliteSessionStore};
use rehearse_types::config::RuntimeConfig;

/// Concrete type aliases for the service generics pinned to infra
/// implementations.
pub type ConcreteRegistry = SessionRegistry<SqliteSessionStore, AnthropicClient, SerperClient>;
pub type ConcreteSessionService =
    SessionService<SqliteSessionStore, AnthropicClient, SerperClient>;
pub type ConcreteSpeechService =
    SpeechService<SqliteSessionStore, AssemblyAiClient, DeepgramSynthesis>;
pub type ConcreteStreamCoordinator =
    StreamingTranscriptionCoordinator<SqliteSessionStore, DeepgramTranscriber>;

/// Shared application state for all HTTP and WS handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: ConcreteSessionService,
    pub speech: ConcreteSpeechService,
    pub stream_coordinator: Arc<ConcreteStreamCoordinator>,
    pub auth: Arc<StaticKeyVerifier>,
    pub resume_extractor: Arc<PlainTextExtractor>,
    pub registry: Arc<ConcreteRegistry>,
    pub bind_addr: String,
}

impl AppState {
    /// Initialize the application state: connect to the database, wire
    /// provider clients, and build the services.
    pub async fn init() -> anyhow::Result<Self> {
        let settings = ProviderSettings::from_env();
        let runtime_config = RuntimeConfig::from_env();

        let pool = DatabasePool::new(&settings.database_url).await?;
        let store = Arc::new(SqliteSessionStore::new(pool));

        let anthropic_key = settings
            .anthropic_api_key
            .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY is not set"))?;
        let llm = Arc::new(AnthropicClient::new(
            anthropic_key,
            settings.anthropic_model.clone(),
        ));

        let serper_key = require_or_warn(settings.serper_api_key, "SERPER_API_KEY");
        let search = Arc::new(SerperClient::new(serper_key));

        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&store),
            llm,
            search,
            runtime_config,
        ));
        let sessions = SessionService::new(Arc::clone(&registry));

        let assemblyai_key = require_or_warn(settings.assemblyai_api_key, "ASSEMBLYAI_API_KEY");
        let deepgram_key = require_or_warn(settings.deepgram_api_key, "DEEPGRAM_API_KEY");
        let transcription = Arc::new(AssemblyAiClient::new(assemblyai_key));
        let synthesis = Arc::new(DeepgramSynthesis::new(SecretString::from(
            deepgram_key.expose_secret(),
        )));
        let speech = SpeechService::new(
            Arc::clone(&store),
            registry.fabric(),
            transcription,
            synthesis,
        );

        let transcriber = Arc::new(DeepgramTranscriber::new(deepgram_key));
        let stream_coordinator = Arc::new(StreamingTranscriptionCoordinator::new(
            store,
            registry.fabric(),
            transcriber,
        ));

        let auth = Arc::new(StaticKeyVerifier::from_config(&settings.api_keys));
        if auth.key_count() == 0 {
            tracing::info!("no API keys configured, all sessions are anonymous");
        }

        Ok(Self {
            sessions,
            speech,
            stream_coordinator,
            auth,
            resume_extractor: Arc::new(PlainTextExtractor),
            registry,
            bind_addr: settings.bind_addr,
        })
    }
}

/// Speech and search providers are optional at startup: the endpoints
/// that need them fail at call time instead of preventing boot.
fn require_or_warn(secret: Option<SecretString>, name: &str) -> SecretString {
    match secret {
        Some(secret) => secret,
        None => {
            tracing::warn!("{name} is not set, dependent endpoints will fail");
            SecretString::from("")
        }
    }
}
