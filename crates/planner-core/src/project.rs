//! Caller-facing shapes and the projector that builds them.
//!
//! Every URL leaving the service is absolute: stored paths may be relative
//! (old local-disk uploads) or absolute (image host), and relative ones are
//! joined onto the configured public base URL.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
  ImageId, SeasonId, SoulId, VisitId,
  image::{Image, ImageType},
  soul::Soul,
  visit::{Visit, VisitWithSoul, days_since},
};

// ─── Views ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
  pub image_id:    ImageId,
  pub image_type:  ImageType,
  /// Absolute URL; `None` when the stored URL is blank.
  pub url:         Option<String>,
  pub file_name:   String,
  pub file_size:   Option<i64>,
  pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitView {
  pub visit_id:       VisitId,
  pub soul_id:        SoulId,
  pub soul_name:      String,
  pub visit_number:   Option<u32>,
  pub global_order:   Option<u32>,
  pub start_date:     NaiveDate,
  pub end_date:       NaiveDate,
  pub is_warband:     bool,
  pub notes:          Option<String>,
  pub days_since_end: i64,
  pub images:         Vec<ImageView>,
}

/// Full soul snapshot with counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoulView {
  pub soul_id:                  SoulId,
  pub season_id:                SeasonId,
  pub season_name:              String,
  pub season_color:             Option<String>,
  pub name:                     String,
  pub order_num:                i32,
  pub start_date:               NaiveDate,
  pub end_date:                 NaiveDate,
  pub keywords:                 Vec<String>,
  pub creator:                  Option<String>,
  pub description:              Option<String>,
  pub is_season_guide:          bool,
  pub images:                   Vec<ImageView>,
  pub representative_image_url: Option<String>,
  pub visits:                   Vec<VisitView>,
  pub total_visits:             usize,
  pub has_traveled:             bool,
  pub last_visit_date:          Option<NaiveDate>,
}

/// One row of the chronological feed or the active set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedRow {
  pub visit_id:                 VisitId,
  pub visit_number:             Option<u32>,
  pub global_order:             Option<u32>,
  pub start_date:               NaiveDate,
  pub end_date:                 NaiveDate,
  pub is_warband:               bool,
  pub is_active:                bool,
  pub soul_id:                  SoulId,
  pub soul_name:                String,
  pub season_id:                SeasonId,
  pub season_name:              String,
  pub season_color:             Option<String>,
  pub order_num:                i32,
  pub keywords:                 Vec<String>,
  pub total_visits:             usize,
  pub representative_image_url: Option<String>,
  pub images:                   Vec<ImageView>,
}

/// One row of the longest-absent ranking: a soul name's latest visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsentRow {
  pub soul:                  SoulView,
  pub last_visit_date:       NaiveDate,
  pub days_since_last_visit: i64,
  pub is_active:             bool,
  pub visit_number:          Option<u32>,
  pub global_order:          Option<u32>,
}

// ─── Projector ───────────────────────────────────────────────────────────────

/// Maps stored entities to views, resolving URLs against `public_base_url`.
#[derive(Debug, Clone)]
pub struct Projector {
  public_base_url: String,
}

impl Projector {
  pub fn new(public_base_url: impl Into<String>) -> Self {
    let mut base = public_base_url.into();
    while base.ends_with('/') {
      base.pop();
    }
    Self { public_base_url: base }
  }

  /// Absolute URLs pass through; relative ones are joined onto the base.
  pub fn resolve_url(&self, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
      return None;
    }
    if has_scheme(raw) {
      return Some(raw.to_owned());
    }
    if raw.starts_with('/') {
      Some(format!("{}{raw}", self.public_base_url))
    } else {
      Some(format!("{}/{raw}", self.public_base_url))
    }
  }

  pub fn image(&self, image: &Image) -> ImageView {
    ImageView {
      image_id:    image.image_id,
      image_type:  image.image_type,
      url:         self.resolve_url(&image.url),
      file_name:   image.file_name.clone(),
      file_size:   image.file_size,
      uploaded_at: image.uploaded_at,
    }
  }

  fn images(&self, images: &[Image]) -> Vec<ImageView> {
    images.iter().map(|i| self.image(i)).collect()
  }

  fn representative_url(&self, images: &[Image]) -> Option<String> {
    representative_image(images).and_then(|i| self.resolve_url(&i.url))
  }

  pub fn visit(&self, visit: &Visit, soul_name: &str, today: NaiveDate) -> VisitView {
    VisitView {
      visit_id:       visit.visit_id,
      soul_id:        visit.soul_id,
      soul_name:      soul_name.to_owned(),
      visit_number:   visit.visit_number,
      global_order:   visit.global_order,
      start_date:     visit.start_date,
      end_date:       visit.end_date,
      is_warband:     visit.is_warband,
      notes:          visit.notes.clone(),
      days_since_end: visit.days_since_end(today),
      images:         self.images(&visit.images),
    }
  }

  pub fn soul(&self, soul: &Soul, today: NaiveDate) -> SoulView {
    SoulView {
      soul_id:                  soul.soul_id,
      season_id:                soul.season_id,
      season_name:              soul.season_name.clone(),
      season_color:             soul.season_color.clone(),
      name:                     soul.name.clone(),
      order_num:                soul.order_num,
      start_date:               soul.start_date,
      end_date:                 soul.end_date,
      keywords:                 soul.keywords.clone(),
      creator:                  soul.creator.clone(),
      description:              soul.description.clone(),
      is_season_guide:          soul.is_season_guide,
      images:                   self.images(&soul.images),
      representative_image_url: self.representative_url(&soul.images),
      visits:                   soul
        .visits
        .iter()
        .map(|v| self.visit(v, &soul.name, today))
        .collect(),
      total_visits:             soul.total_visits(),
      has_traveled:             soul.has_traveled(),
      last_visit_date:          soul.last_visit_date(),
    }
  }

  /// `is_active` is evaluated against `today`.
  pub fn feed_row(&self, row: &VisitWithSoul, today: NaiveDate) -> FeedRow {
    let VisitWithSoul { visit, soul } = row;
    FeedRow {
      visit_id:                 visit.visit_id,
      visit_number:             visit.visit_number,
      global_order:             visit.global_order,
      start_date:               visit.start_date,
      end_date:                 visit.end_date,
      is_warband:               visit.is_warband,
      is_active:                visit.is_active_on(today),
      soul_id:                  soul.soul_id,
      soul_name:                soul.name.clone(),
      season_id:                soul.season_id,
      season_name:              soul.season_name.clone(),
      season_color:             soul.season_color.clone(),
      order_num:                soul.order_num,
      keywords:                 soul.keywords.clone(),
      total_visits:             soul.total_visits(),
      representative_image_url: self.representative_url(&soul.images),
      images:                   self.images(&soul.images),
    }
  }

  pub fn absent_row(&self, latest: &VisitWithSoul, today: NaiveDate) -> AbsentRow {
    let VisitWithSoul { visit, soul } = latest;
    AbsentRow {
      soul:                  self.soul(soul, today),
      last_visit_date:       visit.end_date,
      days_since_last_visit: days_since(visit.end_date, today),
      is_active:             visit.is_active_on(today),
      visit_number:          visit.visit_number,
      global_order:          visit.global_order,
    }
  }
}

/// First image tagged [`ImageType::Representative`].
pub fn representative_image(images: &[Image]) -> Option<&Image> {
  images
    .iter()
    .find(|i| i.image_type == ImageType::Representative)
}

/// `scheme://…` per RFC 3986: a letter followed by letters, digits, `+-.`.
fn has_scheme(url: &str) -> bool {
  let Some((scheme, _)) = url.split_once("://") else {
    return false;
  };
  let mut chars = scheme.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
