//! Runtime configuration with environment overrides.
//!
//! Every knob has a default matching current provider agreements; the
//! `REHEARSE_*` environment variables override them at startup.

use serde::{Deserialize, Serialize};

/// Per-provider maximum concurrent in-flight calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCaps {
    pub batch_transcription: usize,
    pub synthesis: usize,
    pub streaming_transcription: usize,
    pub llm: usize,
    pub search: usize,
}

impl Default for ProviderCaps {
    fn default() -> Self {
        Self {
            batch_transcription: 5,
            synthesis: 26,
            streaming_transcription: 10,
            llm: 8,
            search: 3,
        }
    }
}

/// Tunable runtime configuration for the session substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Minutes of inactivity before a session is abandoned.
    pub idle_budget_minutes: u64,
    /// Remaining minutes at which the warning flag is raised.
    pub warning_threshold_minutes: u64,
    /// Interval between idle-sweeper ticks.
    pub idle_sweep_interval_seconds: u64,
    /// Budget for final-summary generation.
    pub final_summary_budget_seconds: u64,
    /// Budget for one per-turn grading attempt.
    pub per_turn_grading_budget_seconds: u64,
    /// How long an acquire may wait on a provider semaphore.
    pub acquire_timeout_seconds: u64,
    pub caps: ProviderCaps,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            idle_budget_minutes: 15,
            warning_threshold_minutes: 2,
            idle_sweep_interval_seconds: 60,
            final_summary_budget_seconds: 120,
            per_turn_grading_budget_seconds: 30,
            acquire_timeout_seconds: 5,
            caps: ProviderCaps::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `REHEARSE_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_env("REHEARSE_IDLE_BUDGET_MINUTES", &mut config.idle_budget_minutes);
        apply_env(
            "REHEARSE_WARNING_THRESHOLD_MINUTES",
            &mut config.warning_threshold_minutes,
        );
        apply_env(
            "REHEARSE_IDLE_SWEEP_INTERVAL_SECONDS",
            &mut config.idle_sweep_interval_seconds,
        );
        apply_env(
            "REHEARSE_FINAL_SUMMARY_BUDGET_SECONDS",
            &mut config.final_summary_budget_seconds,
        );
        apply_env(
            "REHEARSE_PER_TURN_GRADING_BUDGET_SECONDS",
            &mut config.per_turn_grading_budget_seconds,
        );
        apply_env(
            "REHEARSE_ACQUIRE_TIMEOUT_SECONDS",
            &mut config.acquire_timeout_seconds,
        );
        apply_env(
            "REHEARSE_CAP_BATCH_TRANSCRIPTION",
            &mut config.caps.batch_transcription,
        );
        apply_env("REHEARSE_CAP_SYNTHESIS", &mut config.caps.synthesis);
        apply_env(
            "REHEARSE_CAP_STREAMING_TRANSCRIPTION",
            &mut config.caps.streaming_transcription,
        );
        apply_env("REHEARSE_CAP_LLM", &mut config.caps.llm);
        apply_env("REHEARSE_CAP_SEARCH", &mut config.caps.search);
        config
    }
}

fn apply_env<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        if let Ok(parsed) = raw.parse() {
            *target = parsed;
        }
    }
}
