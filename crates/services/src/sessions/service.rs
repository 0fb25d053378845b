use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use monitor_core::Clock;
use monitor_core::model::{ActivityResult, SessionId, SessionRecord, SessionSnapshot};
use storage::repository::{SessionRepository, StorageError};
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::error::SessionServiceError;

/// Orchestrates the session lifecycle state machine.
///
/// States are `running` and `finished`; `finished` is terminal. This
/// service owns the only mutation paths for session records: creation on
/// [`SessionService::start`], and the one-time finish transition — detected
/// as natural expiry during [`SessionService::poll`], or forced by
/// [`SessionService::stop`]. Readers always derive remaining time from the
/// wall clock, never from accumulated ticks.
#[derive(Clone)]
pub struct SessionService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    classifier: Arc<dyn Classifier>,
    // Sessions whose finish transition is in flight in this process. Keeps
    // the classifier from running twice when poll and stop race. The lock
    // guards only set membership and is never held across an await.
    finishing: Arc<Mutex<HashSet<SessionId>>>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            clock,
            sessions,
            classifier,
            finishing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Create a new running session lasting `duration_min` minutes.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::InvalidDuration` if `duration_min <= 0`
    /// (or the duration overflows milliseconds), and propagates storage
    /// failures from the insert.
    pub async fn start(&self, duration_min: i64) -> Result<SessionId, SessionServiceError> {
        let duration_ms = chrono::Duration::try_minutes(duration_min)
            .map(|d| d.num_milliseconds())
            .filter(|ms| *ms > 0)
            .ok_or(SessionServiceError::InvalidDuration {
                minutes: duration_min,
            })?;

        let id = SessionId::generate();
        let record = SessionRecord::start(id, self.clock.now(), duration_ms).map_err(|_| {
            SessionServiceError::InvalidDuration {
                minutes: duration_min,
            }
        })?;
        self.sessions.insert_session(&record).await?;
        debug!(session = %id, duration_ms, "session started");
        Ok(id)
    }

    /// Current `{status, remaining_ms}` for the session.
    ///
    /// An absent session reads as `{finished, 0}` by policy (expired and
    /// cleaned up elsewhere), never as a hard error. Detecting natural
    /// expiry here performs the one-time finish transition before
    /// returning.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; the record keeps its last committed
    /// state.
    pub async fn poll(&self, id: SessionId) -> Result<SessionSnapshot, SessionServiceError> {
        let Some(record) = self.sessions.get_session(id).await? else {
            return Ok(SessionSnapshot::finished());
        };

        let snapshot = record.snapshot_at(self.clock.now());
        if snapshot.status.is_finished() && !record.is_finished() {
            self.finish_once(id).await?;
            return Ok(SessionSnapshot::finished());
        }
        Ok(snapshot)
    }

    /// Stop the session now, without waiting for natural expiry.
    ///
    /// Idempotent: stopping a finished or unknown session is a no-op
    /// success.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn stop(&self, id: SessionId) -> Result<(), SessionServiceError> {
        let Some(record) = self.sessions.get_session(id).await? else {
            return Ok(());
        };
        if record.is_finished() {
            return Ok(());
        }
        self.finish_once(id).await
    }

    /// Classification payload for a finished session.
    ///
    /// An absent session gets the fallback payload; a running session is
    /// refused with `NotFinished`.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotFinished` while the session runs,
    /// and propagates storage failures.
    pub async fn result(&self, id: SessionId) -> Result<ActivityResult, SessionServiceError> {
        let Some(record) = self.sessions.get_session(id).await? else {
            return Ok(ActivityResult::fallback());
        };
        if !record.is_finished() {
            return Err(SessionServiceError::NotFinished);
        }
        Ok(record
            .result()
            .cloned()
            .unwrap_or_else(ActivityResult::fallback))
    }

    /// One-time finish transition: classify, then compare-and-set the
    /// store.
    ///
    /// The in-process claim keeps concurrent poll/stop callers from
    /// invoking the classifier twice; the store CAS remains the durable
    /// linearization point for the `running -> finished` edge.
    async fn finish_once(&self, id: SessionId) -> Result<(), SessionServiceError> {
        if !self.claim(id) {
            // Another caller is mid-transition; the session reads as
            // finished from here on.
            return Ok(());
        }
        let outcome = self.run_finish(id).await;
        self.unclaim(id);
        outcome
    }

    async fn run_finish(&self, id: SessionId) -> Result<(), SessionServiceError> {
        // Re-check after claiming: the previous claimant may have completed
        // the transition before releasing its claim.
        match self.sessions.get_session(id).await? {
            None => return Ok(()),
            Some(current) if current.is_finished() => return Ok(()),
            Some(_) => {}
        }

        let result = match self.classifier.classify(id).await {
            Ok(result) => result,
            Err(err) => {
                warn!(session = %id, error = %err, "classification failed; storing fallback result");
                ActivityResult::fallback()
            }
        };

        match self.sessions.finish_session(id, &result).await {
            Ok(outcome) => {
                debug!(session = %id, ?outcome, "session finished");
                Ok(())
            }
            // The record vanished between the read and the write; absent
            // reads as finished, so the caller still succeeds.
            Err(StorageError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn claim(&self, id: SessionId) -> bool {
        let mut guard = self
            .finishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(id)
    }

    fn unclaim(&self, id: SessionId) {
        let mut guard = self
            .finishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(&id);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
