use monitor_core::model::{ActivityResult, SessionId, SessionRecord};

use super::{SqliteRepository, mapping};
use crate::repository::{FinishOutcome, SessionRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let result_json = record
            .result()
            .map(mapping::result_to_json)
            .transpose()?;

        sqlx::query(
            r"
                INSERT INTO sessions (id, started_at, duration_ms, status, result)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(record.id().to_string())
        .bind(record.started_at())
        .bind(record.duration_ms())
        .bind(mapping::status_to_str(record.status()))
        .bind(result_json)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, started_at, duration_ms, status, result
                FROM sessions
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(mapping::map_session_row).transpose()
    }

    async fn finish_session(
        &self,
        id: SessionId,
        result: &ActivityResult,
    ) -> Result<FinishOutcome, StorageError> {
        let result_json = mapping::result_to_json(result)?;

        // Optimistic update keyed on the expected prior status. A second
        // caller matches zero rows and falls through to the read below.
        let res = sqlx::query(
            r"
                UPDATE sessions
                SET status = 'finished', result = ?2
                WHERE id = ?1 AND status = 'running'
            ",
        )
        .bind(id.to_string())
        .bind(result_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 1 {
            return Ok(FinishOutcome::Transitioned);
        }

        match self.get_session(id).await? {
            Some(record) if record.is_finished() => Ok(FinishOutcome::AlreadyFinished),
            // Zero rows updated yet the record still reads running: another
            // writer slipped in between the two statements. Surface it.
            Some(_) => Err(StorageError::Conflict),
            None => Err(StorageError::NotFound),
        }
    }
}
