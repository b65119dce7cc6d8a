//! The `CatalogStore` trait.
//!
//! Implemented by storage backends (e.g. `planner-store-sqlite`). The
//! [`Catalog`](crate::catalog::Catalog) service and the HTTP layer depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  SoulId, VisitId,
  image::{Image, NewImage},
  season::{NewSeason, Season},
  soul::{NewSoul, Soul},
  visit::{NewVisit, Visit, VisitPatch, VisitWithSoul},
};

/// Backend errors the catalog must tell apart from plain failures.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The write collided with another visit's `(soul_id, visit_number)`.
  fn is_visit_number_taken(&self) -> bool;
}

/// Abstraction over a catalog store backend.
///
/// Each write is atomic on its own; the store performs no cross-row
/// validation beyond its schema constraints. Rules such as "a visit number is
/// used once per soul" are checked by the caller before writing; a backend
/// that also enforces that rule reports a lost race through
/// [`StoreError::is_visit_number_taken`].
///
/// All methods return `Send` futures so the trait can be used behind `axum`.
pub trait CatalogStore: Send + Sync {
  type Error: StoreError;

  // ── Seed data ─────────────────────────────────────────────────────────

  fn add_season(
    &self,
    input: NewSeason,
  ) -> impl Future<Output = Result<Season, Self::Error>> + Send + '_;

  fn add_soul(
    &self,
    input: NewSoul,
  ) -> impl Future<Output = Result<Soul, Self::Error>> + Send + '_;

  /// Persist image metadata. The store assigns `file_name` as
  /// `<uuid>.<extension>`.
  fn add_image(
    &self,
    input: NewImage,
  ) -> impl Future<Output = Result<Image, Self::Error>> + Send + '_;

  // ── Souls ─────────────────────────────────────────────────────────────

  /// A soul with images and visits loaded. `None` if not found.
  fn get_soul(
    &self,
    id: SoulId,
  ) -> impl Future<Output = Result<Option<Soul>, Self::Error>> + Send + '_;

  // ── Visit writes ──────────────────────────────────────────────────────

  fn record_visit(
    &self,
    input: NewVisit,
  ) -> impl Future<Output = Result<Visit, Self::Error>> + Send + '_;

  /// Apply `patch` atomically and return the updated visit; `None` if `id`
  /// is unknown.
  fn update_visit(
    &self,
    id: VisitId,
    patch: VisitPatch,
  ) -> impl Future<Output = Result<Option<Visit>, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_visit(
    &self,
    id: VisitId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Visit reads ───────────────────────────────────────────────────────

  fn get_visit(
    &self,
    id: VisitId,
  ) -> impl Future<Output = Result<Option<Visit>, Self::Error>> + Send + '_;

  fn find_visit_by_number(
    &self,
    soul_id: SoulId,
    visit_number: u32,
  ) -> impl Future<Output = Result<Option<Visit>, Self::Error>> + Send + '_;

  fn visit_number_exists(
    &self,
    soul_id: SoulId,
    visit_number: u32,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All visits of one soul, ordered by visit number ascending.
  fn visits_for_soul(
    &self,
    soul_id: SoulId,
  ) -> impl Future<Output = Result<Vec<Visit>, Self::Error>> + Send + '_;

  /// Every visit joined with its soul, images included.
  fn visits_with_soul(
    &self,
  ) -> impl Future<Output = Result<Vec<VisitWithSoul>, Self::Error>> + Send + '_;

  /// Visits whose `[start_date, end_date]` contains `date`.
  fn visits_active_on(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<VisitWithSoul>, Self::Error>> + Send + '_;
}
