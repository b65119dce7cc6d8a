//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD` so they compare correctly as
//! text. Timestamps are RFC 3339 strings. Keywords are a compact JSON array.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use planner_core::{
  SoulId, VisitId,
  image::{Image, ImageType},
  soul::Soul,
  visit::Visit,
};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ImageType ───────────────────────────────────────────────────────────────

pub fn encode_image_type(t: ImageType) -> String { t.to_string() }

pub fn decode_image_type(s: &str) -> Result<ImageType> {
  ImageType::from_str(s)
    .map_err(|_| Error::UnknownImageType(s.to_owned()))
}

// ─── Keywords ────────────────────────────────────────────────────────────────

pub fn encode_keywords(keywords: &[String]) -> Result<String> {
  Ok(serde_json::to_string(keywords)?)
}

pub fn decode_keywords(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A soul row joined with its season's name and colour.
pub struct RawSoul {
  pub soul_id:         i64,
  pub season_id:       i64,
  pub season_name:     String,
  pub season_color:    Option<String>,
  pub name:            String,
  pub order_num:       i32,
  pub start_date:      String,
  pub end_date:        String,
  pub keywords:        String,
  pub creator:         Option<String>,
  pub description:     Option<String>,
  pub is_season_guide: bool,
}

impl RawSoul {
  /// Decode with images and visits attached by the caller.
  pub fn into_soul(self, images: Vec<Image>, visits: Vec<Visit>) -> Result<Soul> {
    Ok(Soul {
      soul_id: self.soul_id,
      season_id: self.season_id,
      season_name: self.season_name,
      season_color: self.season_color,
      name: self.name,
      order_num: self.order_num,
      start_date: decode_date(&self.start_date)?,
      end_date: decode_date(&self.end_date)?,
      keywords: decode_keywords(&self.keywords)?,
      creator: self.creator,
      description: self.description,
      is_season_guide: self.is_season_guide,
      images,
      visits,
    })
  }
}

pub struct RawImage {
  pub image_id:    i64,
  pub soul_id:     Option<i64>,
  pub visit_id:    Option<i64>,
  pub image_type:  String,
  pub file_name:   String,
  pub url:         String,
  pub file_size:   Option<i64>,
  pub uploaded_at: String,
}

impl RawImage {
  pub fn into_image(self) -> Result<Image> {
    Ok(Image {
      image_id:    self.image_id,
      image_type:  decode_image_type(&self.image_type)?,
      url:         self.url,
      file_name:   self.file_name,
      file_size:   self.file_size,
      uploaded_at: decode_dt(&self.uploaded_at)?,
    })
  }
}

pub struct RawVisit {
  pub visit_id:     i64,
  pub soul_id:      i64,
  pub visit_number: Option<u32>,
  pub global_order: Option<u32>,
  pub start_date:   String,
  pub end_date:     String,
  pub is_warband:   bool,
  pub notes:        Option<String>,
}

impl RawVisit {
  pub fn into_visit(self, images: Vec<Image>) -> Result<Visit> {
    Ok(Visit {
      visit_id:     self.visit_id,
      soul_id:      self.soul_id,
      visit_number: self.visit_number,
      global_order: self.global_order,
      start_date:   decode_date(&self.start_date)?,
      end_date:     decode_date(&self.end_date)?,
      is_warband:   self.is_warband,
      notes:        self.notes,
      images,
    })
  }
}

// ─── Assembly ────────────────────────────────────────────────────────────────

/// Images decoded and bucketed by owner.
#[derive(Default)]
pub struct ImageIndex {
  by_soul:  HashMap<SoulId, Vec<Image>>,
  by_visit: HashMap<VisitId, Vec<Image>>,
}

impl ImageIndex {
  pub fn build(raws: Vec<RawImage>) -> Result<Self> {
    let mut index = Self::default();
    for raw in raws {
      let (soul_id, visit_id) = (raw.soul_id, raw.visit_id);
      let image = raw.into_image()?;
      if let Some(id) = soul_id {
        index.by_soul.entry(id).or_default().push(image);
      } else if let Some(id) = visit_id {
        index.by_visit.entry(id).or_default().push(image);
      }
    }
    Ok(index)
  }

  pub fn take_soul(&mut self, id: SoulId) -> Vec<Image> {
    self.by_soul.remove(&id).unwrap_or_default()
  }

  pub fn take_visit(&mut self, id: VisitId) -> Vec<Image> {
    self.by_visit.remove(&id).unwrap_or_default()
  }
}

/// Decode visits (in the given order) with their images attached.
pub fn decode_visits(raws: Vec<RawVisit>, images: &mut ImageIndex) -> Result<Vec<Visit>> {
  raws
    .into_iter()
    .map(|raw| {
      let imgs = images.take_visit(raw.visit_id);
      raw.into_visit(imgs)
    })
    .collect()
}

/// Decode souls and nest each one's visits in visit-number order.
pub fn decode_souls(
  raws: Vec<RawSoul>,
  visits: &[Visit],
  images: &mut ImageIndex,
) -> Result<Vec<Soul>> {
  let mut by_soul: HashMap<SoulId, Vec<Visit>> = HashMap::new();
  for v in visits {
    by_soul.entry(v.soul_id).or_default().push(v.clone());
  }
  for list in by_soul.values_mut() {
    list.sort_by_key(|v| (v.visit_number, v.visit_id));
  }

  raws
    .into_iter()
    .map(|raw| {
      let id = raw.soul_id;
      let imgs = images.take_soul(id);
      raw.into_soul(imgs, by_soul.remove(&id).unwrap_or_default())
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_round_trip_as_sortable_text() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert_eq!(encode_date(d), "2024-03-01");
    assert_eq!(decode_date("2024-03-01").unwrap(), d);
    assert!(encode_date(d) > encode_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
  }

  #[test]
  fn malformed_date_is_an_error() {
    assert!(matches!(decode_date("03/01/2024"), Err(Error::DateParse(_))));
  }

  #[test]
  fn unknown_image_type_is_reported() {
    assert!(matches!(
      decode_image_type("THUMBNAIL"),
      Err(Error::UnknownImageType(t)) if t == "THUMBNAIL"
    ));
    assert_eq!(decode_image_type("LOCATION").unwrap(), ImageType::Location);
  }

  #[test]
  fn keywords_are_a_json_array() {
    let kw = vec!["cape".to_owned(), "bow".to_owned()];
    let encoded = encode_keywords(&kw).unwrap();
    assert_eq!(encoded, r#"["cape","bow"]"#);
    assert_eq!(decode_keywords(&encoded).unwrap(), kw);
  }
}
