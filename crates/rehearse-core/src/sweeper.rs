//! Periodic idle-timeout sweep over live sessions.
//!
//! On each tick: sessions inside the warning window get their warning
//! flag raised (readable via `time_remaining`); sessions at or past the
//! idle deadline are cleaned up through the registry, which flushes state
//! and marks them abandoned. A session reaching exactly zero remaining
//! transitions on the next tick, not before.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clients::{LlmClient, SearchClient};
use crate::registry::SessionRegistry;
use crate::store::SessionStore;

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub warned: usize,
    pub cleaned: usize,
}

/// The background idle sweeper.
pub struct IdleSweeper;

impl IdleSweeper {
    /// Spawn the sweep loop on its configured interval.
    pub fn spawn<S, L, W>(
        registry: Arc<SessionRegistry<S, L, W>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        S: SessionStore + 'static,
        L: LlmClient + 'static,
        W: SearchClient + 'static,
    {
        let interval = Duration::from_secs(registry.config().idle_sweep_interval_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = Self::sweep_at(&registry, Utc::now()).await;
                        if report.warned > 0 || report.cleaned > 0 {
                            tracing::info!(
                                warned = report.warned,
                                cleaned = report.cleaned,
                                "idle sweep"
                            );
                        }
                    }
                    _ = cancel.cancelled() => {
                        tracing::debug!("idle sweeper stopping");
                        break;
                    }
                }
            }
        })
    }

    /// Run one sweep against the current wall clock.
    pub async fn sweep_once<S, L, W>(registry: &SessionRegistry<S, L, W>) -> SweepReport
    where
        S: SessionStore,
        L: LlmClient,
        W: SearchClient,
    {
        Self::sweep_at(registry, Utc::now()).await
    }

    /// Run one sweep as of `now`.
    pub async fn sweep_at<S, L, W>(
        registry: &SessionRegistry<S, L, W>,
        now: DateTime<Utc>,
    ) -> SweepReport
    where
        S: SessionStore,
        L: LlmClient,
        W: SearchClient,
    {
        let clock = registry.clock();
        let mut report = SweepReport::default();

        for id in clock.warning_candidates(now) {
            if !clock.is_warned(id) {
                clock.mark_warned(id);
                report.warned += 1;
                tracing::debug!(session_id = %id, "session nearing idle timeout");
            }
        }

        for id in clock.expired(now) {
            match registry.cleanup(id).await {
                Ok(()) => {
                    report.cleaned += 1;
                    tracing::info!(session_id = %id, "session abandoned on idle timeout");
                }
                Err(err) => {
                    tracing::warn!(session_id = %id, error = %err, "idle cleanup failed");
                }
            }
        }

        report
    }
}
