//! Error type for `planner-store-sqlite`.

use planner_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The `(soul_id, visit_number)` unique index rejected a visit write.
  #[error("visit number {0} is already used by this soul")]
  VisitNumberTaken(u32),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown image type: {0:?}")]
  UnknownImageType(String),

  #[error("season not found: {0}")]
  SeasonNotFound(planner_core::SeasonId),

  #[error("soul not found: {0}")]
  SoulNotFound(planner_core::SoulId),

  /// A row read back right after insertion was missing.
  #[error("row vanished after insert: {0}")]
  MissingAfterInsert(&'static str),
}

impl StoreError for Error {
  fn is_visit_number_taken(&self) -> bool { matches!(self, Self::VisitNumberTaken(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
