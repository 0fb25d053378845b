use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ActivityResult, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionRecordError {
    #[error("session duration must be positive, got {duration_ms}ms")]
    InvalidDuration { duration_ms: i64 },
}

/// Lifecycle state of a session.
///
/// `Finished` is terminal: a record never transitions back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Finished,
}

impl SessionStatus {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, SessionStatus::Finished)
    }
}

/// Derived view of a session at one wall-clock instant.
///
/// Never persisted; always recomputed from the record so that every reader
/// observing the same instant sees the same status and remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub remaining_ms: i64,
}

impl SessionSnapshot {
    /// Snapshot for a session that is over, or was never found.
    #[must_use]
    pub fn finished() -> Self {
        Self {
            status: SessionStatus::Finished,
            remaining_ms: 0,
        }
    }
}

/// Authoritative record for one timed analysis session.
///
/// `id`, `started_at` and `duration_ms` are fixed at creation; only the
/// status (and, exactly once, the result) change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    id: SessionId,
    started_at: DateTime<Utc>,
    duration_ms: i64,
    status: SessionStatus,
    result: Option<ActivityResult>,
}

impl SessionRecord {
    /// Create a freshly started record with `status = running` and no result.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError::InvalidDuration` if `duration_ms <= 0`.
    pub fn start(
        id: SessionId,
        started_at: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<Self, SessionRecordError> {
        if duration_ms <= 0 {
            return Err(SessionRecordError::InvalidDuration { duration_ms });
        }
        Ok(Self {
            id,
            started_at,
            duration_ms,
            status: SessionStatus::Running,
            result: None,
        })
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError::InvalidDuration` if the stored duration
    /// is not positive.
    pub fn from_persisted(
        id: SessionId,
        started_at: DateTime<Utc>,
        duration_ms: i64,
        status: SessionStatus,
        result: Option<ActivityResult>,
    ) -> Result<Self, SessionRecordError> {
        if duration_ms <= 0 {
            return Err(SessionRecordError::InvalidDuration { duration_ms });
        }
        Ok(Self {
            id,
            started_at,
            duration_ms,
            status,
            result,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn result(&self) -> Option<&ActivityResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Derive `{status, remaining_ms}` from wall-clock `now`.
    ///
    /// Pure read: a record whose time has run out reads as finished with
    /// zero remaining, but the record itself is not mutated here. The
    /// persisted finish transition belongs to the service layer.
    #[must_use]
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> SessionSnapshot {
        if self.status.is_finished() {
            return SessionSnapshot::finished();
        }

        let elapsed_ms = now.signed_duration_since(self.started_at).num_milliseconds();
        let remaining_ms = self.duration_ms - elapsed_ms;
        if remaining_ms <= 0 {
            SessionSnapshot::finished()
        } else {
            SessionSnapshot {
                status: SessionStatus::Running,
                remaining_ms,
            }
        }
    }

    /// Apply the one-time finish transition, attaching the result payload.
    ///
    /// Idempotent on already-finished records: the stored result is kept and
    /// the new payload is discarded.
    pub fn finish(&mut self, result: ActivityResult) {
        if self.status.is_finished() {
            return;
        }
        self.status = SessionStatus::Finished;
        self.result = Some(result);
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityLabel;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn running_record(duration_ms: i64) -> SessionRecord {
        SessionRecord::start(SessionId::generate(), fixed_now(), duration_ms).unwrap()
    }

    #[test]
    fn start_rejects_non_positive_duration() {
        let err = SessionRecord::start(SessionId::generate(), fixed_now(), 0).unwrap_err();
        assert_eq!(err, SessionRecordError::InvalidDuration { duration_ms: 0 });

        let err = SessionRecord::start(SessionId::generate(), fixed_now(), -60_000).unwrap_err();
        assert!(matches!(err, SessionRecordError::InvalidDuration { .. }));
    }

    #[test]
    fn fresh_record_is_running_without_result() {
        let record = running_record(60_000);
        assert_eq!(record.status(), SessionStatus::Running);
        assert!(record.result().is_none());
    }

    #[test]
    fn snapshot_counts_down_from_wall_clock() {
        let record = running_record(60_000);

        let snap = record.snapshot_at(fixed_now());
        assert_eq!(snap.status, SessionStatus::Running);
        assert_eq!(snap.remaining_ms, 60_000);

        let snap = record.snapshot_at(fixed_now() + Duration::milliseconds(30_000));
        assert_eq!(snap.status, SessionStatus::Running);
        assert_eq!(snap.remaining_ms, 30_000);
    }

    #[test]
    fn snapshot_reads_finished_at_and_past_expiry() {
        let record = running_record(60_000);

        let snap = record.snapshot_at(fixed_now() + Duration::milliseconds(60_000));
        assert_eq!(snap, SessionSnapshot::finished());

        let snap = record.snapshot_at(fixed_now() + Duration::milliseconds(61_000));
        assert_eq!(snap, SessionSnapshot::finished());
    }

    #[test]
    fn snapshot_does_not_mutate_the_record() {
        let record = running_record(1_000);
        let _ = record.snapshot_at(fixed_now() + Duration::milliseconds(5_000));
        // The derived view says finished; the record itself stays running.
        assert_eq!(record.status(), SessionStatus::Running);
    }

    #[test]
    fn finished_record_always_snapshots_finished() {
        let mut record = running_record(60_000);
        record.finish(ActivityResult::fallback());

        // Even "before" expiry on the wall clock, finished wins.
        let snap = record.snapshot_at(fixed_now());
        assert_eq!(snap, SessionSnapshot::finished());
    }

    #[test]
    fn finish_is_monotonic_and_keeps_first_result() {
        let mut record = running_record(60_000);
        let first = ActivityResult::fallback();
        record.finish(first.clone());
        assert!(record.is_finished());

        let mut second = ActivityResult::fallback();
        second.predicted = ActivityLabel::Study;
        record.finish(second);

        assert_eq!(record.result(), Some(&first));
    }

    #[test]
    fn persisted_roundtrip_keeps_fields() {
        let id = SessionId::generate();
        let record = SessionRecord::from_persisted(
            id,
            fixed_now(),
            120_000,
            SessionStatus::Finished,
            Some(ActivityResult::fallback()),
        )
        .unwrap();

        assert_eq!(record.id(), id);
        assert_eq!(record.duration_ms(), 120_000);
        assert!(record.is_finished());
        assert!(record.result().is_some());
    }
}
