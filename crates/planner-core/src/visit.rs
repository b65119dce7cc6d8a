//! Traveling visits: one recorded appearance of a soul.
//!
//! `visit_number` 0 is the original season appearance; 1, 2, … are repeat
//! visits. Rows imported without a number are season-only appearances and are
//! left out of the feed and the absence ranking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SoulId, VisitId, image::Image, soul::Soul};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
  pub visit_id:     VisitId,
  pub soul_id:      SoulId,
  pub visit_number: Option<u32>,
  /// Position among all visits across all souls.
  pub global_order: Option<u32>,
  pub start_date:   NaiveDate,
  /// Inclusive.
  pub end_date:     NaiveDate,
  pub is_warband:   bool,
  pub notes:        Option<String>,
  pub images:       Vec<Image>,
}

impl Visit {
  /// `date` falls within `[start_date, end_date]`.
  pub fn is_active_on(&self, date: NaiveDate) -> bool {
    self.start_date <= date && date <= self.end_date
  }

  pub fn days_since_end(&self, today: NaiveDate) -> i64 {
    days_since(self.end_date, today)
  }
}

/// Whole days from `date` to `today`, clamped at zero.
pub fn days_since(date: NaiveDate, today: NaiveDate) -> i64 {
  (today - date).num_days().max(0)
}

/// Reject a range whose end precedes its start.
pub fn check_date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
  if end < start {
    return Err(Error::InvalidDateRange { start, end });
  }
  Ok(())
}

/// A visit joined with its owning soul (images and sibling visits included).
#[derive(Debug, Clone, PartialEq)]
pub struct VisitWithSoul {
  pub visit: Visit,
  pub soul:  Soul,
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CatalogStore::record_visit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVisit {
  pub soul_id:      SoulId,
  pub visit_number: Option<u32>,
  pub global_order: Option<u32>,
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  #[serde(default)]
  pub is_warband:   bool,
  pub notes:        Option<String>,
}

impl NewVisit {
  /// Convenience constructor for a numbered, non-warband visit.
  pub fn new(
    soul_id: SoulId,
    visit_number: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
  ) -> Self {
    Self {
      soul_id,
      visit_number: Some(visit_number),
      global_order: None,
      start_date,
      end_date,
      is_warband: false,
      notes: None,
    }
  }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitPatch {
  pub visit_number: Option<u32>,
  pub global_order: Option<u32>,
  pub start_date:   Option<NaiveDate>,
  pub end_date:     Option<NaiveDate>,
  pub is_warband:   Option<bool>,
  pub notes:        Option<String>,
}

impl VisitPatch {
  /// Apply the set fields onto `visit`.
  pub fn apply(&self, visit: &mut Visit) {
    if let Some(n) = self.visit_number {
      visit.visit_number = Some(n);
    }
    if let Some(g) = self.global_order {
      visit.global_order = Some(g);
    }
    if let Some(d) = self.start_date {
      visit.start_date = d;
    }
    if let Some(d) = self.end_date {
      visit.end_date = d;
    }
    if let Some(w) = self.is_warband {
      visit.is_warband = w;
    }
    if let Some(n) = &self.notes {
      visit.notes = Some(n.clone());
    }
  }
}
