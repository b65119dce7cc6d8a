//! Builders shared by unit tests.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::{
  ImageId, SoulId, VisitId,
  image::{Image, ImageType},
  soul::Soul,
  visit::{Visit, VisitWithSoul},
};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn image(id: ImageId, image_type: ImageType, url: &str) -> Image {
  Image {
    image_id: id,
    image_type,
    url: url.to_owned(),
    file_name: format!("{id}.png"),
    file_size: None,
    uploaded_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
  }
}

pub fn soul(id: SoulId, name: &str) -> Soul {
  Soul {
    soul_id: id,
    season_id: 1,
    season_name: "Season of Roots".to_owned(),
    season_color: Some("#557a46".to_owned()),
    name: name.to_owned(),
    order_num: id as i32,
    start_date: d(2023, 1, 1),
    end_date: d(2023, 3, 1),
    keywords: Vec::new(),
    creator: None,
    description: None,
    is_season_guide: false,
    images: Vec::new(),
    visits: Vec::new(),
  }
}

pub fn visit(
  id: VisitId,
  soul_id: SoulId,
  visit_number: Option<u32>,
  start: NaiveDate,
  end: NaiveDate,
) -> Visit {
  Visit {
    visit_id: id,
    soul_id,
    visit_number,
    global_order: None,
    start_date: start,
    end_date: end,
    is_warband: false,
    notes: None,
    images: Vec::new(),
  }
}

/// A joined row for soul `(soul_id, name)`.
pub fn joined(
  visit_id: VisitId,
  soul_id: SoulId,
  name: &str,
  visit_number: Option<u32>,
  start: NaiveDate,
  end: NaiveDate,
) -> VisitWithSoul {
  let v = visit(visit_id, soul_id, visit_number, start, end);
  let mut s = soul(soul_id, name);
  s.visits.push(v.clone());
  VisitWithSoul { visit: v, soul: s }
}
