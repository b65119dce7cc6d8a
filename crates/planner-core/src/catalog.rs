//! [`Catalog`]: request-scoped read views and the visit write path.
//!
//! Each call loads a fresh snapshot from the store, derives the requested view
//! in memory, projects it, and windows it. Nothing is cached between calls.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
  Error, Result, SoulId, VisitId,
  aggregate::{
    build_active_set, build_chronological_feed, build_longest_absent_ranking,
    matches_query,
  },
  clock::{Clock, SystemClock},
  page::{Page, PageRequest},
  project::{AbsentRow, FeedRow, Projector, SoulView, VisitView},
  store::{CatalogStore, StoreError},
  visit::{NewVisit, Visit, VisitPatch, VisitWithSoul, check_date_range},
};

pub struct Catalog<S> {
  store:     Arc<S>,
  projector: Projector,
  clock:     Arc<dyn Clock>,
}

impl<S> Clone for Catalog<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      projector: self.projector.clone(),
      clock:     Arc::clone(&self.clock),
    }
  }
}

impl<S: CatalogStore> Catalog<S> {
  /// A catalog reading "today" from the system clock.
  pub fn new(store: Arc<S>, projector: Projector) -> Self {
    Self { store, projector, clock: Arc::new(SystemClock) }
  }

  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  /// Map a failed visit write, turning a lost uniqueness race into the same
  /// conflict the pre-check reports.
  fn write_error(&self, err: S::Error, soul_id: SoulId, visit_number: Option<u32>) -> Error {
    match visit_number {
      Some(visit_number) if err.is_visit_number_taken() => {
        warn!(soul_id, visit_number, "visit number taken by a concurrent write");
        Error::VisitNumberConflict { soul_id, visit_number }
      }
      _ => Error::store(err),
    }
  }

  async fn snapshot(&self) -> Result<Vec<VisitWithSoul>> {
    self.store.visits_with_soul().await.map_err(Error::store)
  }

  // ── Derived views ───────────────────────────────────────────────────────

  /// All numbered visits, newest first.
  pub async fn chronological_feed(&self, request: PageRequest) -> Result<Page<FeedRow>> {
    let visits = self.snapshot().await?;
    let rows = build_chronological_feed(&visits, self.today(), &self.projector);
    debug!(rows = rows.len(), ?request, "built chronological feed");
    Ok(Page::window(rows, request))
  }

  /// The chronological feed restricted to rows matching `query`.
  pub async fn search_feed(
    &self,
    query: &str,
    request: PageRequest,
  ) -> Result<Page<FeedRow>> {
    let visits: Vec<VisitWithSoul> = self
      .snapshot()
      .await?
      .into_iter()
      .filter(|row| matches_query(row, query))
      .collect();
    let rows = build_chronological_feed(&visits, self.today(), &self.projector);
    debug!(rows = rows.len(), query, "built feed search");
    Ok(Page::window(rows, request))
  }

  /// Visits running on `as_of` (defaults to today).
  pub async fn active_visits(&self, as_of: Option<NaiveDate>) -> Result<Vec<FeedRow>> {
    let as_of = as_of.unwrap_or_else(|| self.today());
    let visits = self
      .store
      .visits_active_on(as_of)
      .await
      .map_err(Error::store)?;
    let rows: Vec<FeedRow> = build_active_set(&visits, as_of)
      .into_iter()
      .map(|row| self.projector.feed_row(row, as_of))
      .collect();
    debug!(rows = rows.len(), %as_of, "built active set");
    Ok(rows)
  }

  /// One row per soul name with its latest visit.
  pub async fn longest_absent(&self, request: PageRequest) -> Result<Page<AbsentRow>> {
    let visits = self.snapshot().await?;
    let rows = build_longest_absent_ranking(&visits, self.today(), &self.projector);
    debug!(rows = rows.len(), ?request, "built longest-absent ranking");
    Ok(Page::window(rows, request))
  }

  // ── Souls ───────────────────────────────────────────────────────────────

  pub async fn get_soul(&self, id: SoulId) -> Result<SoulView> {
    let soul = self
      .store
      .get_soul(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SoulNotFound(id))?;
    Ok(self.projector.soul(&soul, self.today()))
  }

  // ── Visit reads ─────────────────────────────────────────────────────────

  async fn soul_name(&self, id: SoulId) -> Result<String> {
    self
      .store
      .get_soul(id)
      .await
      .map_err(Error::store)?
      .map(|s| s.name)
      .ok_or(Error::SoulNotFound(id))
  }

  fn visit_view(&self, visit: &Visit, soul_name: &str) -> VisitView {
    self.projector.visit(visit, soul_name, self.today())
  }

  /// Visits of one soul in visit-number order.
  pub async fn visits_for_soul(&self, soul_id: SoulId) -> Result<Vec<VisitView>> {
    let name = self.soul_name(soul_id).await?;
    let visits = self
      .store
      .visits_for_soul(soul_id)
      .await
      .map_err(Error::store)?;
    Ok(visits.iter().map(|v| self.visit_view(v, &name)).collect())
  }

  pub async fn get_visit(&self, id: VisitId) -> Result<VisitView> {
    let visit = self
      .store
      .get_visit(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::VisitNotFound(id))?;
    let name = self.soul_name(visit.soul_id).await?;
    Ok(self.visit_view(&visit, &name))
  }

  // ── Visit writes ────────────────────────────────────────────────────────

  /// Record a visit. The soul must exist and the visit number must be free.
  pub async fn create_visit(&self, input: NewVisit) -> Result<VisitView> {
    let name = self.soul_name(input.soul_id).await?;
    check_date_range(input.start_date, input.end_date)?;

    if let Some(number) = input.visit_number {
      let taken = self
        .store
        .visit_number_exists(input.soul_id, number)
        .await
        .map_err(Error::store)?;
      if taken {
        warn!(soul_id = input.soul_id, visit_number = number, "visit number already used");
        return Err(Error::VisitNumberConflict {
          soul_id:      input.soul_id,
          visit_number: number,
        });
      }
    }

    let (soul_id, number) = (input.soul_id, input.visit_number);
    let visit = self
      .store
      .record_visit(input)
      .await
      .map_err(|e| self.write_error(e, soul_id, number))?;
    info!(visit_id = visit.visit_id, soul_id = visit.soul_id, "recorded visit");
    Ok(self.visit_view(&visit, &name))
  }

  /// Partially update a visit. Renumbering onto another visit's number is a
  /// conflict; keeping the current number is not.
  pub async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> Result<VisitView> {
    let mut current = self
      .store
      .get_visit(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::VisitNotFound(id))?;

    if let Some(number) = patch.visit_number
      && current.visit_number != Some(number)
    {
      let existing = self
        .store
        .find_visit_by_number(current.soul_id, number)
        .await
        .map_err(Error::store)?;
      if existing.is_some_and(|other| other.visit_id != id) {
        warn!(visit_id = id, visit_number = number, "renumber conflicts with another visit");
        return Err(Error::VisitNumberConflict {
          soul_id:      current.soul_id,
          visit_number: number,
        });
      }
    }

    patch.apply(&mut current);
    check_date_range(current.start_date, current.end_date)?;

    let (soul_id, number) = (current.soul_id, current.visit_number);
    let updated = self
      .store
      .update_visit(id, patch)
      .await
      .map_err(|e| self.write_error(e, soul_id, number))?
      .ok_or(Error::VisitNotFound(id))?;
    let name = self.soul_name(updated.soul_id).await?;
    info!(visit_id = id, "updated visit");
    Ok(self.visit_view(&updated, &name))
  }

  pub async fn delete_visit(&self, id: VisitId) -> Result<()> {
    let deleted = self.store.delete_visit(id).await.map_err(Error::store)?;
    if !deleted {
      return Err(Error::VisitNotFound(id));
    }
    info!(visit_id = id, "deleted visit");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::BTreeMap, sync::Mutex};

  use chrono::NaiveDate;

  use super::*;
  use crate::{
    clock::FixedClock,
    fixtures::{d, soul, visit},
    image::{Image, NewImage},
    season::{NewSeason, Season},
    soul::{NewSoul, Soul},
  };

  #[derive(Debug, thiserror::Error)]
  #[error("visit number taken")]
  struct NumberTaken;

  impl StoreError for NumberTaken {
    fn is_visit_number_taken(&self) -> bool { true }
  }

  type MemResult<T> = Result<T, NumberTaken>;

  /// In-memory store keyed by id; only what the catalog reads is supported.
  /// Writes enforce one visit number per soul the way a unique index would.
  #[derive(Default)]
  struct MemStore {
    souls:       Mutex<BTreeMap<SoulId, Soul>>,
    visits:      Mutex<BTreeMap<VisitId, Visit>>,
    /// Number lookups miss, as if another writer got in after the check.
    stale_reads: bool,
  }

  impl MemStore {
    fn with_soul(self, s: Soul) -> Self {
      self.souls.lock().unwrap().insert(s.soul_id, s);
      self
    }

    fn with_visit(self, v: Visit) -> Self {
      self.visits.lock().unwrap().insert(v.visit_id, v);
      self
    }

    fn with_stale_reads(mut self) -> Self {
      self.stale_reads = true;
      self
    }

    fn number_taken(visits: &BTreeMap<VisitId, Visit>, v: &Visit) -> bool {
      v.visit_number.is_some()
        && visits.values().any(|o| {
          o.visit_id != v.visit_id && o.soul_id == v.soul_id && o.visit_number == v.visit_number
        })
    }

    fn joined(&self) -> Vec<VisitWithSoul> {
      let souls = self.souls.lock().unwrap();
      let visits = self.visits.lock().unwrap();
      visits
        .values()
        .filter_map(|v| {
          let mut s = souls.get(&v.soul_id)?.clone();
          s.visits = visits.values().filter(|o| o.soul_id == s.soul_id).cloned().collect();
          Some(VisitWithSoul { visit: v.clone(), soul: s })
        })
        .collect()
    }
  }

  impl CatalogStore for MemStore {
    type Error = NumberTaken;

    async fn add_season(&self, _: NewSeason) -> MemResult<Season> { unimplemented!() }
    async fn add_soul(&self, _: NewSoul) -> MemResult<Soul> { unimplemented!() }
    async fn add_image(&self, _: NewImage) -> MemResult<Image> { unimplemented!() }

    async fn get_soul(&self, id: SoulId) -> MemResult<Option<Soul>> {
      Ok(self.souls.lock().unwrap().get(&id).cloned())
    }

    async fn record_visit(&self, input: NewVisit) -> MemResult<Visit> {
      let mut visits = self.visits.lock().unwrap();
      let id = visits.keys().max().copied().unwrap_or(0) + 1;
      let v = Visit {
        visit_id:     id,
        soul_id:      input.soul_id,
        visit_number: input.visit_number,
        global_order: input.global_order,
        start_date:   input.start_date,
        end_date:     input.end_date,
        is_warband:   input.is_warband,
        notes:        input.notes,
        images:       Vec::new(),
      };
      if Self::number_taken(&visits, &v) {
        return Err(NumberTaken);
      }
      visits.insert(id, v.clone());
      Ok(v)
    }

    async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> MemResult<Option<Visit>> {
      let mut visits = self.visits.lock().unwrap();
      let Some(mut v) = visits.get(&id).cloned() else { return Ok(None) };
      patch.apply(&mut v);
      if Self::number_taken(&visits, &v) {
        return Err(NumberTaken);
      }
      visits.insert(id, v.clone());
      Ok(Some(v))
    }

    async fn delete_visit(&self, id: VisitId) -> MemResult<bool> {
      Ok(self.visits.lock().unwrap().remove(&id).is_some())
    }

    async fn get_visit(&self, id: VisitId) -> MemResult<Option<Visit>> {
      Ok(self.visits.lock().unwrap().get(&id).cloned())
    }

    async fn find_visit_by_number(&self, soul_id: SoulId, n: u32) -> MemResult<Option<Visit>> {
      if self.stale_reads {
        return Ok(None);
      }
      Ok(
        self
          .visits
          .lock()
          .unwrap()
          .values()
          .find(|v| v.soul_id == soul_id && v.visit_number == Some(n))
          .cloned(),
      )
    }

    async fn visit_number_exists(&self, soul_id: SoulId, n: u32) -> MemResult<bool> {
      Ok(self.find_visit_by_number(soul_id, n).await?.is_some())
    }

    async fn visits_for_soul(&self, soul_id: SoulId) -> MemResult<Vec<Visit>> {
      let mut out: Vec<Visit> = self
        .visits
        .lock()
        .unwrap()
        .values()
        .filter(|v| v.soul_id == soul_id)
        .cloned()
        .collect();
      out.sort_by_key(|v| v.visit_number);
      Ok(out)
    }

    async fn visits_with_soul(&self) -> MemResult<Vec<VisitWithSoul>> {
      Ok(self.joined())
    }

    async fn visits_active_on(&self, date: NaiveDate) -> MemResult<Vec<VisitWithSoul>> {
      Ok(self.joined().into_iter().filter(|r| r.visit.is_active_on(date)).collect())
    }
  }

  fn catalog(store: MemStore, today: NaiveDate) -> Catalog<MemStore> {
    Catalog::new(Arc::new(store), Projector::new("https://cdn.example.com"))
      .with_clock(FixedClock(today))
  }

  fn five_visit_store() -> MemStore {
    MemStore::default()
      .with_soul(soul(1, "Alpha"))
      .with_soul(soul(2, "Beta"))
      .with_visit(visit(1, 1, Some(1), d(2024, 1, 1), d(2024, 1, 5)))
      .with_visit(visit(2, 1, Some(2), d(2024, 2, 1), d(2024, 2, 5)))
      .with_visit(visit(3, 2, Some(1), d(2024, 3, 1), d(2024, 3, 5)))
      .with_visit(visit(4, 2, Some(2), d(2024, 4, 1), d(2024, 4, 5)))
      .with_visit(visit(5, 2, Some(3), d(2024, 5, 1), d(2024, 5, 5)))
  }

  // ── Views ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn feed_pages_report_full_total() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));

    let first = c.chronological_feed(PageRequest::new(0, 2)).await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total_elements, 5);
    assert_eq!(first.items[0].visit_id, 5);

    let past = c.chronological_feed(PageRequest::new(3, 2)).await.unwrap();
    assert!(past.items.is_empty());
    assert_eq!(past.total_elements, 5);
  }

  #[tokio::test]
  async fn empty_store_gives_empty_pages() {
    let c = catalog(MemStore::default(), d(2024, 6, 1));
    let feed = c.chronological_feed(PageRequest::new(0, 15)).await.unwrap();
    let absent = c.longest_absent(PageRequest::new(0, 20)).await.unwrap();
    assert_eq!(feed.total_elements, 0);
    assert_eq!(absent.total_elements, 0);
    assert!(c.active_visits(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn active_visits_default_to_today() {
    let c = catalog(five_visit_store(), d(2024, 3, 3));
    let today = c.active_visits(None).await.unwrap();
    assert_eq!(today.iter().map(|r| r.visit_id).collect::<Vec<_>>(), vec![3]);
    assert!(today[0].is_active);

    let other = c.active_visits(Some(d(2024, 4, 5))).await.unwrap();
    assert_eq!(other.iter().map(|r| r.visit_id).collect::<Vec<_>>(), vec![4]);
  }

  #[tokio::test]
  async fn longest_absent_has_one_row_per_name() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    let page = c.longest_absent(PageRequest::new(0, 20)).await.unwrap();
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.items[0].soul.name, "Beta");
    assert_eq!(page.items[0].last_visit_date, d(2024, 5, 5));
    assert_eq!(page.items[1].last_visit_date, d(2024, 2, 5));
  }

  #[tokio::test]
  async fn longest_absent_past_the_end_keeps_total() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    let page = c.longest_absent(PageRequest::new(5, 20)).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.page, 5);
  }

  #[tokio::test]
  async fn search_filters_before_paging() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    let page = c.search_feed("alp", PageRequest::new(0, 1)).await.unwrap();
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].soul_name, "Alpha");
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_entities_are_not_found() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    assert!(matches!(c.get_soul(99).await, Err(Error::SoulNotFound(99))));
    assert!(matches!(c.get_visit(99).await, Err(Error::VisitNotFound(99))));
    assert!(matches!(c.visits_for_soul(99).await, Err(Error::SoulNotFound(99))));
  }

  #[tokio::test]
  async fn visits_for_soul_are_projected() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    let visits = c.visits_for_soul(2).await.unwrap();
    assert_eq!(visits.len(), 3);
    assert!(visits.iter().all(|v| v.soul_name == "Beta"));
    assert_eq!(visits[2].days_since_end, 27);
  }

  // ── Writes ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_rejects_duplicate_visit_number() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    let err = c
      .create_visit(NewVisit::new(1, 2, d(2024, 7, 1), d(2024, 7, 5)))
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      Error::VisitNumberConflict { soul_id: 1, visit_number: 2 }
    ));

    let ok = c
      .create_visit(NewVisit::new(1, 3, d(2024, 7, 1), d(2024, 7, 5)))
      .await
      .unwrap();
    assert_eq!(ok.visit_number, Some(3));
    assert_eq!(ok.soul_name, "Alpha");
  }

  #[tokio::test]
  async fn lost_number_race_is_a_conflict() {
    let c = catalog(five_visit_store().with_stale_reads(), d(2024, 6, 1));

    let created = c.create_visit(NewVisit::new(1, 2, d(2024, 7, 1), d(2024, 7, 5))).await;
    assert!(matches!(
      created,
      Err(Error::VisitNumberConflict { soul_id: 1, visit_number: 2 })
    ));

    let renumber = VisitPatch { visit_number: Some(2), ..Default::default() };
    assert!(matches!(
      c.update_visit(1, renumber).await,
      Err(Error::VisitNumberConflict { soul_id: 1, visit_number: 2 })
    ));

    let feed = c.chronological_feed(PageRequest::new(0, 15)).await.unwrap();
    assert_eq!(feed.total_elements, 5);
  }

  #[tokio::test]
  async fn create_requires_existing_soul_and_valid_range() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    assert!(matches!(
      c.create_visit(NewVisit::new(42, 1, d(2024, 7, 1), d(2024, 7, 5))).await,
      Err(Error::SoulNotFound(42))
    ));
    assert!(matches!(
      c.create_visit(NewVisit::new(1, 9, d(2024, 7, 5), d(2024, 7, 1))).await,
      Err(Error::InvalidDateRange { .. })
    ));
  }

  #[tokio::test]
  async fn update_allows_same_number_and_rejects_taken_one() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));

    let same = VisitPatch { visit_number: Some(1), is_warband: Some(true), ..Default::default() };
    let view = c.update_visit(1, same).await.unwrap();
    assert!(view.is_warband);

    let taken = VisitPatch { visit_number: Some(2), ..Default::default() };
    assert!(matches!(
      c.update_visit(1, taken).await,
      Err(Error::VisitNumberConflict { soul_id: 1, visit_number: 2 })
    ));

    let bad_range = VisitPatch { end_date: Some(d(2023, 12, 1)), ..Default::default() };
    assert!(matches!(
      c.update_visit(1, bad_range).await,
      Err(Error::InvalidDateRange { .. })
    ));
  }

  #[tokio::test]
  async fn delete_then_delete_again_is_not_found() {
    let c = catalog(five_visit_store(), d(2024, 6, 1));
    c.delete_visit(3).await.unwrap();
    assert!(matches!(c.delete_visit(3).await, Err(Error::VisitNotFound(3))));
    let feed = c.chronological_feed(PageRequest::new(0, 15)).await.unwrap();
    assert_eq!(feed.total_elements, 4);
  }
}
