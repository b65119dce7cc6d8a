//! Souls: the collectible catalog entries.
//!
//! A soul row is tied to one season. The same collectible returning in a later
//! season or rerun may exist as a separate soul row with its own id; `name` is
//! what ties those rows together for ranking purposes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{SeasonId, SoulId, image::Image, visit::Visit};

/// A soul with its images and visits loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soul {
  pub soul_id:         SoulId,
  pub season_id:       SeasonId,
  pub season_name:     String,
  pub season_color:    Option<String>,
  pub name:            String,
  pub order_num:       i32,
  /// Original in-season appearance.
  pub start_date:      NaiveDate,
  pub end_date:        NaiveDate,
  pub keywords:        Vec<String>,
  pub creator:         Option<String>,
  pub description:     Option<String>,
  pub is_season_guide: bool,
  pub images:          Vec<Image>,
  /// Ordered by visit number ascending.
  pub visits:          Vec<Visit>,
}

impl Soul {
  pub fn has_traveled(&self) -> bool { !self.visits.is_empty() }

  pub fn total_visits(&self) -> usize { self.visits.len() }

  /// End date of the most recent visit, if any.
  pub fn last_visit_date(&self) -> Option<NaiveDate> {
    self.visits.iter().map(|v| v.end_date).max()
  }
}

/// Input to [`crate::store::CatalogStore::add_soul`].
#[derive(Debug, Clone)]
pub struct NewSoul {
  pub season_id:       SeasonId,
  pub name:            String,
  pub order_num:       i32,
  pub start_date:      NaiveDate,
  pub end_date:        NaiveDate,
  pub keywords:        Vec<String>,
  pub creator:         Option<String>,
  pub description:     Option<String>,
  pub is_season_guide: bool,
}

impl NewSoul {
  /// Convenience constructor with metadata left empty.
  pub fn new(
    season_id: SeasonId,
    name: impl Into<String>,
    order_num: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
  ) -> Self {
    Self {
      season_id,
      name: name.into(),
      order_num,
      start_date,
      end_date,
      keywords: Vec::new(),
      creator: None,
      description: None,
      is_season_guide: false,
    }
  }
}
