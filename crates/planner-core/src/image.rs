//! Images attached to souls and visits.
//!
//! Only metadata lives here; the bytes sit on whatever host `url` points at.
//! `url` may be relative (legacy local-disk paths) or absolute (image host).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{ImageId, SoulId, VisitId};

/// The role an image plays on a soul's page.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageType {
  /// The primary image shown in listings.
  Representative,
  Location,
  WearingShot,
  NodeTable,
}

/// A stored image record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
  pub image_id:    ImageId,
  pub image_type:  ImageType,
  /// Relative path or absolute URL, exactly as stored.
  pub url:         String,
  /// Store-assigned `<uuid>.<ext>` name.
  pub file_name:   String,
  pub file_size:   Option<i64>,
  pub uploaded_at: DateTime<Utc>,
}

/// What an image hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwner {
  Soul(SoulId),
  Visit(VisitId),
}

/// Input to [`crate::store::CatalogStore::add_image`].
#[derive(Debug, Clone)]
pub struct NewImage {
  pub owner:      ImageOwner,
  pub image_type: ImageType,
  pub url:        String,
  /// File extension without the dot, e.g. `"webp"`.
  pub extension:  String,
  pub file_size:  Option<i64>,
}
