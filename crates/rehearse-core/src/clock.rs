//! Per-session activity tracking and idle-expiry arithmetic.
//!
//! The clock stores the last-activity timestamp and warning flag for each
//! live session. Time-remaining is `(last_activity + idle_budget) - now`.
//! Every public method takes `now` explicitly so expiry behavior is
//! deterministic under test.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use rehearse_types::session::SessionId;

#[derive(Debug, Clone, Copy)]
struct ActivityEntry {
    last_activity: DateTime<Utc>,
    warned: bool,
}

/// Tracks last-activity timestamps for live sessions.
pub struct ActivityClock {
    entries: DashMap<SessionId, ActivityEntry>,
    idle_budget: Duration,
    warning_threshold: Duration,
}

impl ActivityClock {
    pub fn new(idle_budget_minutes: u64, warning_threshold_minutes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            idle_budget: Duration::minutes(idle_budget_minutes as i64),
            warning_threshold: Duration::minutes(warning_threshold_minutes as i64),
        }
    }

    /// Minutes of idle budget granted on create/ping.
    pub fn idle_budget_minutes(&self) -> u64 {
        self.idle_budget.num_minutes() as u64
    }

    /// Start tracking a session as of `now`.
    pub fn register(&self, id: SessionId, now: DateTime<Utc>) {
        self.entries.insert(
            id,
            ActivityEntry {
                last_activity: now,
                warned: false,
            },
        );
    }

    /// Start tracking only if the session is not already tracked.
    ///
    /// Used on hydration, where the snapshot's last-activity timestamp must
    /// not clobber a fresher in-memory one.
    pub fn register_if_absent(&self, id: SessionId, last_activity: DateTime<Utc>) {
        self.entries.entry(id).or_insert(ActivityEntry {
            last_activity,
            warned: false,
        });
    }

    /// Advance last-activity to `now` and clear any warning.
    pub fn touch(&self, id: SessionId, now: DateTime<Utc>) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.last_activity = now;
            entry.warned = false;
        }
    }

    /// Extend the session: reset last-activity to `now` and return the new
    /// expiry instant. `None` when the session is not tracked.
    pub fn ping(&self, id: SessionId, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut entry = self.entries.get_mut(&id)?;
        entry.last_activity = now;
        entry.warned = false;
        Some(now + self.idle_budget)
    }

    /// Remaining time before idle expiry. Negative once past deadline;
    /// `None` when the session is not tracked.
    pub fn time_remaining(&self, id: SessionId, now: DateTime<Utc>) -> Option<Duration> {
        let entry = self.entries.get(&id)?;
        Some(entry.last_activity + self.idle_budget - now)
    }

    /// Whether the sweeper has flagged this session as near expiry.
    pub fn is_warned(&self, id: SessionId) -> bool {
        self.entries.get(&id).map(|e| e.warned).unwrap_or(false)
    }

    /// Set the warning flag (sweeper only).
    pub fn mark_warned(&self, id: SessionId) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.warned = true;
        }
    }

    /// Stop tracking a session.
    pub fn remove(&self, id: SessionId) {
        self.entries.remove(&id);
    }

    /// Sessions at or past their idle deadline as of `now`.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        self.entries
            .iter()
            .filter(|entry| entry.value().last_activity + self.idle_budget <= now)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Sessions inside the warning window (but not yet expired) as of `now`.
    pub fn warning_candidates(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        self.entries
            .iter()
            .filter(|entry| {
                let remaining = entry.value().last_activity + self.idle_budget - now;
                remaining > Duration::zero() && remaining <= self.warning_threshold
            })
            .map(|entry| *entry.key())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> ActivityClock {
        ActivityClock::new(15, 2)
    }

    #[test]
    fn test_time_remaining_counts_down() {
        let clock = clock();
        let id = SessionId::new();
        let t0 = Utc::now();
        clock.register(id, t0);

        let remaining = clock.time_remaining(id, t0 + Duration::minutes(5)).unwrap();
        assert_eq!(remaining, Duration::minutes(10));

        let remaining = clock.time_remaining(id, t0 + Duration::minutes(16)).unwrap();
        assert!(remaining < Duration::zero());
    }

    #[test]
    fn test_ping_resets_expiry() {
        let clock = clock();
        let id = SessionId::new();
        let t0 = Utc::now();
        clock.register(id, t0);

        let t1 = t0 + Duration::minutes(14);
        let expiry = clock.ping(id, t1).unwrap();
        assert_eq!(expiry, t1 + Duration::minutes(15));

        // Repeated pings within the same instant do not extend beyond one
        // idle budget from the latest ping.
        let expiry2 = clock.ping(id, t1).unwrap();
        assert_eq!(expiry2, expiry);
    }

    #[test]
    fn test_ping_unknown_session_is_none() {
        let clock = clock();
        assert!(clock.ping(SessionId::new(), Utc::now()).is_none());
    }

    #[test]
    fn test_expired_at_exact_deadline() {
        let clock = clock();
        let id = SessionId::new();
        let t0 = Utc::now();
        clock.register(id, t0);

        // One second before the deadline: not expired.
        assert!(clock.expired(t0 + Duration::minutes(15) - Duration::seconds(1)).is_empty());
        // Exactly at the deadline: expired.
        assert_eq!(clock.expired(t0 + Duration::minutes(15)), vec![id]);
    }

    #[test]
    fn test_warning_window() {
        let clock = clock();
        let id = SessionId::new();
        let t0 = Utc::now();
        clock.register(id, t0);

        assert!(clock.warning_candidates(t0 + Duration::minutes(10)).is_empty());
        assert_eq!(
            clock.warning_candidates(t0 + Duration::minutes(13) + Duration::seconds(30)),
            vec![id]
        );
        // Past deadline sessions are expired, not warning candidates.
        assert!(clock.warning_candidates(t0 + Duration::minutes(16)).is_empty());
    }

    #[test]
    fn test_touch_clears_warning() {
        let clock = clock();
        let id = SessionId::new();
        let t0 = Utc::now();
        clock.register(id, t0);
        clock.mark_warned(id);
        assert!(clock.is_warned(id));

        clock.touch(id, t0 + Duration::minutes(1));
        assert!(!clock.is_warned(id));
    }

    #[test]
    fn test_register_if_absent_keeps_fresher_entry() {
        let clock = clock();
        let id = SessionId::new();
        let t0 = Utc::now();
        clock.register(id, t0);
        clock.register_if_absent(id, t0 - Duration::minutes(10));

        let remaining = clock.time_remaining(id, t0).unwrap();
        assert_eq!(remaining, Duration::minutes(15));
    }
}
