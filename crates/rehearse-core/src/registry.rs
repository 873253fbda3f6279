//! Process-wide registry of live sessions.
//!
//! The registry mutex guards only the session-id → entry map; all session
//! work runs under the per-session mutex inside each entry. Hydration
//! loads from the store *outside* the registry lock and re-checks the map
//! before insert, so concurrent acquires are idempotent: the first loser
//! observes the winner's orchestrator.
//!
//! Snapshot persistence is coalescing: if a write is already in flight
//! the entry is marked dirty and the in-flight writer re-reads the latest
//! snapshot before finishing, so the final write reflects the final
//! in-memory state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use rehearse_types::config::RuntimeConfig;
use rehearse_types::error::SessionError;
use rehearse_types::session::{SessionConfig, SessionId, SessionStatus};

use crate::clients::{LlmClient, SearchClient};
use crate::clock::ActivityClock;
use crate::limits::RateLimitFabric;
use crate::session::SessionOrchestrator;
use crate::store::SessionStore;

/// A live session: the orchestrator behind its mutex plus persistence and
/// mutation bookkeeping.
#[derive(Debug)]
pub struct SessionEntry<L, W> {
    pub orchestrator: Mutex<SessionOrchestrator<L, W>>,
    /// At-most-one in-flight state mutation per session.
    mutation_gate: AtomicBool,
    /// Snapshot superseded while a write was in flight.
    dirty: AtomicBool,
    /// A snapshot write is currently in flight.
    save_in_flight: AtomicBool,
}

impl<L, W> SessionEntry<L, W> {
    fn new(orchestrator: SessionOrchestrator<L, W>) -> Self
    where
        L: LlmClient,
        W: SearchClient,
    {
        Self {
            orchestrator: Mutex::new(orchestrator),
            mutation_gate: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            save_in_flight: AtomicBool::new(false),
        }
    }

    /// Claim the session's single mutation slot. `None` when another
    /// mutating request is already in flight.
    pub fn try_begin_mutation(&self) -> Option<MutationGuard<'_>> {
        if self.mutation_gate.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(MutationGuard(&self.mutation_gate))
        }
    }
}

/// RAII guard for the per-session mutation slot.
pub struct MutationGuard<'a>(&'a AtomicBool);

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single source of truth for which sessions are live in this process.
pub struct SessionRegistry<S, L, W> {
    store: Arc<S>,
    llm: Arc<L>,
    search: Arc<W>,
    fabric: Arc<RateLimitFabric>,
    clock: Arc<ActivityClock>,
    config: RuntimeConfig,
    sessions: Mutex<HashMap<SessionId, Arc<SessionEntry<L, W>>>>,
}

impl<S, L, W> SessionRegistry<S, L, W>
where
    S: SessionStore,
    L: LlmClient,
    W: SearchClient,
{
    pub fn new(store: Arc<S>, llm: Arc<L>, search: Arc<W>, config: RuntimeConfig) -> Self {
        let fabric = Arc::new(RateLimitFabric::new(
            &config.caps,
            Duration::from_secs(config.acquire_timeout_seconds),
        ));
        let clock = Arc::new(ActivityClock::new(
            config.idle_budget_minutes,
            config.warning_threshold_minutes,
        ));
        Self {
            store,
            llm,
            search,
            fabric,
            clock,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a session id, publish the orchestrator, and write the
    /// initial snapshot.
    ///
    /// If the store write fails the id is not published: no partial
    /// create leaks.
    pub async fn create(
        &self,
        config: SessionConfig,
        owner_user_id: Option<String>,
    ) -> Result<SessionId, SessionError> {
        config.validate().map_err(SessionError::Validation)?;

        let id = SessionId::new();
        let orchestrator = SessionOrchestrator::new(
            id,
            owner_user_id,
            config,
            Arc::clone(&self.llm),
            Arc::clone(&self.search),
        );
        let snapshot = orchestrator.snapshot();
        self.store.put_session(&snapshot).await.map_err(|e| {
            tracing::error!(session_id = %id, error = %e, "initial snapshot failed");
            SessionError::PersistenceDegraded(e.to_string())
        })?;

        let entry = Arc::new(SessionEntry::new(orchestrator));
        self.sessions.lock().await.insert(id, entry);
        self.clock.register(id, Utc::now());
        tracing::info!(session_id = %id, "session created");
        Ok(id)
    }

    /// Resolve a live entry, hydrating from the store on a miss.
    pub async fn acquire(&self, id: SessionId) -> Result<Arc<SessionEntry<L, W>>, SessionError> {
        if let Some(entry) = self.sessions.lock().await.get(&id) {
            return Ok(Arc::clone(entry));
        }

        // Load outside the registry lock; holding it across store I/O
        // would block unrelated sessions.
        let snapshot = self
            .store
            .get_session(id)
            .await
            .map_err(SessionError::from)?
            .ok_or(SessionError::NotFound)?;
        let last_activity = snapshot.meta.stats.last_activity_at;
        let orchestrator = SessionOrchestrator::hydrate(
            snapshot,
            Arc::clone(&self.llm),
            Arc::clone(&self.search),
        );

        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .entry(id)
            .or_insert_with(|| Arc::new(SessionEntry::new(orchestrator)));
        let entry = Arc::clone(entry);
        drop(sessions);

        self.clock.register_if_absent(id, last_activity);
        tracing::debug!(session_id = %id, "session hydrated");
        Ok(entry)
    }

    /// Persist the current snapshot of a live session, coalescing with any
    /// in-flight write.
    pub async fn persist(&self, id: SessionId) -> Result<(), SessionError> {
        let entry = match self.sessions.lock().await.get(&id) {
            Some(entry) => Arc::clone(entry),
            // Already evicted; release/cleanup flushed it.
            None => return Ok(()),
        };
        self.flush_entry(id, &entry).await
    }

    /// Flush state to the store and evict the session from memory.
    ///
    /// Idempotent: releasing an unknown or already-released id succeeds.
    /// On a store failure the in-memory copy is retained and marked dirty.
    pub async fn release(&self, id: SessionId) -> Result<(), SessionError> {
        let entry = match self.sessions.lock().await.get(&id) {
            Some(entry) => Arc::clone(entry),
            None => {
                self.clock.remove(id);
                return Ok(());
            }
        };

        self.flush_entry(id, &entry).await.inspect_err(|e| {
            tracing::error!(session_id = %id, error = %e, "flush failed, session retained");
        })?;

        self.sessions.lock().await.remove(&id);
        self.clock.remove(id);
        tracing::info!(session_id = %id, "session released");
        Ok(())
    }

    /// Release, first marking the session abandoned if still active.
    ///
    /// Idempotent: repeated cleanups succeed without further writes.
    pub async fn cleanup(&self, id: SessionId) -> Result<(), SessionError> {
        let live = self.sessions.lock().await.get(&id).map(Arc::clone);
        if let Some(entry) = live {
            entry.orchestrator.lock().await.mark_abandoned();
            self.flush_entry(id, &entry).await?;
            self.sessions.lock().await.remove(&id);
            self.clock.remove(id);
            tracing::info!(session_id = %id, "session cleaned up");
            return Ok(());
        }

        // Not live: fix up the stored record if it still reads active.
        match self.store.get_session(id).await {
            Ok(Some(mut snapshot)) if snapshot.meta.status == SessionStatus::Active => {
                snapshot.meta.status = SessionStatus::Abandoned;
                self.store
                    .put_session(&snapshot)
                    .await
                    .map_err(|e| SessionError::PersistenceDegraded(e.to_string()))?;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(SessionError::PersistenceDegraded(e.to_string())),
        }
    }

    /// Ids of sessions currently live in this process.
    pub async fn live_sessions(&self) -> Vec<SessionId> {
        self.sessions.lock().await.keys().copied().collect()
    }

    async fn flush_entry(
        &self,
        id: SessionId,
        entry: &SessionEntry<L, W>,
    ) -> Result<(), SessionError> {
        if entry.save_in_flight.swap(true, Ordering::AcqRel) {
            entry.dirty.store(true, Ordering::Release);
            return Ok(());
        }

        loop {
            let snapshot = entry.orchestrator.lock().await.snapshot();
            match self.store.put_session(&snapshot).await {
                Ok(()) => {
                    if !entry.dirty.swap(false, Ordering::AcqRel) {
                        break;
                    }
                    // Superseded while writing; write the newer snapshot.
                }
                Err(e) => {
                    entry.dirty.store(true, Ordering::Release);
                    entry.save_in_flight.store(false, Ordering::Release);
                    tracing::warn!(session_id = %id, error = %e, "snapshot write failed");
                    return Err(SessionError::PersistenceDegraded(e.to_string()));
                }
            }
        }
        entry.save_in_flight.store(false, Ordering::Release);
        Ok(())
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub fn fabric(&self) -> Arc<RateLimitFabric> {
        Arc::clone(&self.fabric)
    }

    pub fn clock(&self) -> Arc<ActivityClock> {
        Arc::clone(&self.clock)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::{FixedSearch, MemoryStore, ScriptedLlm};

    fn registry() -> (
        Arc<MemoryStore>,
        SessionRegistry<MemoryStore, ScriptedLlm, FixedSearch>,
    ) {
        let store = Arc::new(MemoryStore::default());
        let registry = SessionRegistry::new(
            Arc::clone(&store),
            ScriptedLlm::new(vec![]),
            Arc::new(FixedSearch),
            RuntimeConfig::default(),
        );
        (store, registry)
    }

    #[tokio::test]
    async fn create_publishes_and_persists() {
        let (store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();
        assert!(store.sessions.contains_key(&id));
        assert_eq!(registry.live_sessions().await, vec![id]);
    }

    #[tokio::test]
    async fn create_with_failing_store_leaks_nothing() {
        let (store, registry) = registry();
        store.fail_writes.store(true, Ordering::SeqCst);
        let err = registry
            .create(SessionConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::PersistenceDegraded(_)));
        assert!(registry.live_sessions().await.is_empty());
        assert!(store.sessions.is_empty());
    }

    #[tokio::test]
    async fn acquire_unknown_session_is_not_found() {
        let (_store, registry) = registry();
        let err = registry.acquire(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }

    #[tokio::test]
    async fn release_then_acquire_rehydrates() {
        let (_store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();

        registry.release(id).await.unwrap();
        assert!(registry.live_sessions().await.is_empty());

        let entry = registry.acquire(id).await.unwrap();
        assert_eq!(entry.orchestrator.lock().await.id(), id);
        assert_eq!(registry.live_sessions().await, vec![id]);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (_store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();
        registry.release(id).await.unwrap();
        registry.release(id).await.unwrap();
        registry.release(SessionId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn failed_flush_retains_session_in_memory() {
        let (store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = registry.release(id).await.unwrap_err();
        assert!(matches!(err, SessionError::PersistenceDegraded(_)));
        assert_eq!(registry.live_sessions().await, vec![id]);

        // Store recovers; release now succeeds.
        store.fail_writes.store(false, Ordering::SeqCst);
        registry.release(id).await.unwrap();
        assert!(registry.live_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn cleanup_marks_active_session_abandoned() {
        let (store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();

        registry.cleanup(id).await.unwrap();
        let stored = store.sessions.get(&id).unwrap();
        assert_eq!(stored.meta.status, SessionStatus::Abandoned);

        // Second cleanup: success, no extra write.
        let writes_before = store.write_count.load(Ordering::SeqCst);
        registry.cleanup(id).await.unwrap();
        assert_eq!(store.write_count.load(Ordering::SeqCst), writes_before);
    }

    #[tokio::test]
    async fn concurrent_acquire_hydrates_once() {
        let (_store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();
        registry.release(id).await.unwrap();

        let registry = Arc::new(registry);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.acquire(id).await }));
        }
        let mut entries = Vec::new();
        for handle in handles {
            entries.push(handle.await.unwrap().unwrap());
        }
        // Every winner and loser observes the same entry.
        for entry in &entries[1..] {
            assert!(Arc::ptr_eq(&entries[0], entry));
        }
    }

    #[tokio::test]
    async fn mutation_gate_admits_one_at_a_time() {
        let (_store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();
        let entry = registry.acquire(id).await.unwrap();

        let guard = entry.try_begin_mutation().expect("gate should be free");
        assert!(entry.try_begin_mutation().is_none(), "gate must be exclusive");
        drop(guard);
        assert!(entry.try_begin_mutation().is_some(), "gate frees on drop");
    }

    #[tokio::test]
    async fn persist_after_eviction_is_a_no_op() {
        let (_store, registry) = registry();
        let id = registry.create(SessionConfig::default(), None).await.unwrap();
        registry.release(id).await.unwrap();
        registry.persist(id).await.unwrap();
    }
}
