//! Job entity model.

use catcher_core::job::JobStatus;
use catcher_core::types::{serialize_timestamp, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `jobs` table.
///
/// This is also the record the HTTP layer serializes: timestamps use the
/// fixed `YYYY-MM-DDTHH:MM:SSZ` format and `error` is `""` when none has
/// been recorded.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub url: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    /// Number of successful claims. Only ever incremented.
    pub attempts: i64,
    pub error: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Timestamp,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: Timestamp,
}
