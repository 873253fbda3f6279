//! LLM provider clients.

pub mod anthropic;

pub use anthropic::AnthropicClient;
