//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent LLM call instrumentation across the codebase. All constants
//! are string slices usable in `tracing::span!` and `tracing::info_span!`
//! field names.
//!
//! Every provider call is wrapped in a `generate` span carrying one of
//! the `OP_*` values below as its operation name and the issuing agent
//! role ("interviewer" or "coach") as the agent name, so the three LLM
//! call sites are distinguishable in traces.

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "anthropic").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "claude-sonnet-4-20250514").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

// --- Agent-specific attributes ---

/// The logical agent role issuing the call ("interviewer" or "coach").
pub const GEN_AI_AGENT_NAME: &str = "gen_ai.agent.name";

// --- Operation name values ---

/// Interviewer turn generation.
pub const OP_NEXT_TURN: &str = "next_turn";

/// Per-turn answer evaluation by the coach.
pub const OP_EVALUATE_ANSWER: &str = "evaluate_answer";

/// Terminal session summary by the coach.
pub const OP_FINAL_SUMMARY: &str = "final_summary";

// --- Provider name values ---

/// Anthropic provider identifier.
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
