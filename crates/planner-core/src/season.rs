//! Seasons: the time-boxed release periods souls belong to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::SeasonId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
  pub season_id:        SeasonId,
  pub name:             String,
  pub order_num:        i32,
  pub start_date:       NaiveDate,
  pub end_date:         NaiveDate,
  /// Display colour, e.g. `"#8FB3FF"`.
  pub color:            Option<String>,
  pub is_collaboration: bool,
}

/// Input to [`crate::store::CatalogStore::add_season`].
#[derive(Debug, Clone)]
pub struct NewSeason {
  pub name:             String,
  pub order_num:        i32,
  pub start_date:       NaiveDate,
  pub end_date:         NaiveDate,
  pub color:            Option<String>,
  pub is_collaboration: bool,
}
