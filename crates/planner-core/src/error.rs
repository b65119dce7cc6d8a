//! Error types for `planner-core`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::{SoulId, VisitId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("soul not found: {0}")]
  SoulNotFound(SoulId),

  #[error("visit not found: {0}")]
  VisitNotFound(VisitId),

  #[error("soul {soul_id} already has a visit numbered {visit_number}")]
  VisitNumberConflict { soul_id: SoulId, visit_number: u32 },

  #[error("end date {end} is before start date {start}")]
  InvalidDateRange { start: NaiveDate, end: NaiveDate },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
