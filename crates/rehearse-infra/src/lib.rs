//! Concrete implementations of the capability traits consumed by
//! rehearse-core: SQLite persistence, Anthropic LLM, Serper search,
//! AssemblyAI batch transcription, Deepgram streaming transcription and
//! synthesis, static-key auth, and resume extraction.

pub mod auth;
pub mod config;
pub mod llm;
pub mod resume;
pub mod search;
pub mod speech;
pub mod store;
