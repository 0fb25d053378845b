use monitor_core::model::{ActivityResult, SessionId, SessionRecord, SessionStatus};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn session_id_from_str(s: &str) -> Result<SessionId, StorageError> {
    s.parse::<SessionId>().map_err(ser)
}

/// Converts a `SessionStatus` to its storage representation.
/// This must stay consistent with the CHECK constraint on `sessions.status`.
pub(crate) fn status_to_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Running => "running",
        SessionStatus::Finished => "finished",
    }
}

pub(crate) fn parse_status(s: &str) -> Result<SessionStatus, StorageError> {
    match s {
        "running" => Ok(SessionStatus::Running),
        "finished" => Ok(SessionStatus::Finished),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

/// The result column stores the classification payload verbatim as JSON.
pub(crate) fn result_to_json(result: &ActivityResult) -> Result<String, StorageError> {
    serde_json::to_string(result).map_err(ser)
}

pub(crate) fn result_from_json(json: Option<String>) -> Result<Option<ActivityResult>, StorageError> {
    json.map(|raw| serde_json::from_str::<ActivityResult>(&raw).map_err(ser))
        .transpose()
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
    let id = session_id_from_str(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let duration_ms: i64 = row.try_get("duration_ms").map_err(ser)?;

    let status_str: String = row.try_get("status").map_err(ser)?;
    let status = parse_status(status_str.as_str())?;

    let result = result_from_json(row.try_get::<Option<String>, _>("result").map_err(ser)?)?;

    SessionRecord::from_persisted(id, started_at, duration_ms, status, result).map_err(ser)
}
