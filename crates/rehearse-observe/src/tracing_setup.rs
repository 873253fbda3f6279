//! Tracing subscriber initialization for the rehearse services.
//!
//! All components log through `tracing` with a shared field vocabulary:
//! `session_id` on every session-scoped event, `task_id` on speech-task
//! events, `provider` on fabric acquires, and `attempt` on retry loops.
//! The fmt layer prints targets and span-close timing so per-call latency
//! of the GenAI spans (see [`crate::genai_attrs`]) is visible without an
//! exporter.
//!
//! # Usage
//!
//! ```no_run
//! // Structured logging only
//! rehearse_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // With OpenTelemetry export to stdout (for local development)
//! rehearse_observe::tracing_setup::init_tracing(true).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Tracer name reported to OpenTelemetry.
pub const SERVICE_NAME: &str = "rehearse";

/// Filter applied when `RUST_LOG` is unset. Background workers (coach
/// grading, summary generation, the idle sweeper) narrate at debug in
/// the core crate; provider clients stay at info to keep prompt-sized
/// payloads out of the logs.
const DEFAULT_DIRECTIVES: &str = "info,rehearse_core=debug";

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Initialize the global tracing subscriber.
///
/// - Installs a structured `fmt` layer with target visibility and span
///   close timing (the GenAI spans around LLM calls report their latency
///   on close).
/// - Honors `RUST_LOG` when set, otherwise applies the service defaults
///   in [`DEFAULT_DIRECTIVES`].
/// - When `enable_otel` is true, additionally bridges tracing spans to
///   OpenTelemetry using a stdout exporter (suitable for local
///   development; swap the exporter for OTLP in production).
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// the OTel pipeline fails to initialize.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer(SERVICE_NAME);
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        // Store the provider for shutdown and register it globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Call this before process exit so buffered spans (late coach merges,
/// final snapshot writes) are exported. Safe to call even when OTel was
/// not enabled (no-op then).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        // A typo in the fallback directives would silently drop all logs.
        let filter = EnvFilter::try_new(DEFAULT_DIRECTIVES);
        assert!(filter.is_ok());
    }

    #[test]
    fn test_shutdown_without_init_is_a_no_op() {
        shutdown_tracing();
    }
}
