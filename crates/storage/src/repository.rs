use async_trait::async_trait;
use monitor_core::model::{ActivityResult, SessionId, SessionRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Outcome of the atomic finish transition on a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// This call performed the `running -> finished` write.
    Transitioned,
    /// The record was already finished; the submitted payload was discarded
    /// and the stored one kept.
    AlreadyFinished,
}

/// Repository contract for session records.
///
/// There is exactly one authoritative record per ID. All status mutation
/// goes through [`SessionRepository::finish_session`]; callers never update
/// a record in place.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a newly started session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a record with the same ID already
    /// exists, or other storage errors.
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// Absent sessions are `Ok(None)`, not an error; the "absent reads as
    /// finished" policy belongs to the service layer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>, StorageError>;

    /// Atomically transition `running -> finished` and attach the payload.
    ///
    /// Compare-and-set keyed on the stored status: the write happens only if
    /// the record is still running, so two racing callers cannot both
    /// perform the transition. The loser gets `AlreadyFinished` back and
    /// must treat the session as read-only from then on.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record exists for `id`, or
    /// other storage errors.
    async fn finish_session(
        &self,
        id: SessionId,
        result: &ActivityResult,
    ) -> Result<FinishOutcome, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl InMemorySessionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&record.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(record.id(), record.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn finish_session(
        &self,
        id: SessionId,
        result: &ActivityResult,
    ) -> Result<FinishOutcome, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.get_mut(&id) {
            None => Err(StorageError::NotFound),
            Some(record) if record.is_finished() => Ok(FinishOutcome::AlreadyFinished),
            Some(record) => {
                record.finish(result.clone());
                Ok(FinishOutcome::Transitioned)
            }
        }
    }
}

/// Aggregates the session repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemorySessionRepository::new()),
        }
    }
}
