//! Handlers for `/visits` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/visits/feed` | `?page=&size=` (default size 15) |
//! | `GET`    | `/visits/search` | `?q=&page=&size=` (default size 15) |
//! | `GET`    | `/visits/active` | Optional `?as_of=YYYY-MM-DD` |
//! | `GET`    | `/visits/longest-absent` | `?page=&size=` (default size 20) |
//! | `GET`    | `/visits/:id` | 404 if not found |
//! | `POST`   | `/visits` | Admin; 409 if the visit number is taken |
//! | `PUT`    | `/visits/:id` | Admin; partial update |
//! | `DELETE` | `/visits/:id` | Admin; 204 on success |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use planner_core::{
  VisitId,
  page::{Page, PageRequest},
  project::{AbsentRow, FeedRow, VisitView},
  store::CatalogStore,
  visit::{NewVisit, VisitPatch},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

const FEED_PAGE_SIZE: usize = 15;
const ABSENT_PAGE_SIZE: usize = 20;

// ─── Paging ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page: Option<usize>,
  pub size: Option<usize>,
}

impl PageParams {
  fn request(&self, default_size: usize) -> PageRequest {
    PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(default_size))
  }
}

// ─── Derived views ────────────────────────────────────────────────────────────

/// `GET /visits/feed[?page=<n>&size=<n>]`
pub async fn feed<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<FeedRow>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let page = state
    .catalog
    .chronological_feed(params.request(FEED_PAGE_SIZE))
    .await?;
  Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub q:    String,
  pub page: Option<usize>,
  pub size: Option<usize>,
}

/// `GET /visits/search?q=<text>[&page=<n>&size=<n>]`
pub async fn search<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Page<FeedRow>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let request = PageParams { page: params.page, size: params.size }.request(FEED_PAGE_SIZE);
  let page = state.catalog.search_feed(&params.q, request).await?;
  Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct ActiveParams {
  pub as_of: Option<NaiveDate>,
}

/// `GET /visits/active[?as_of=<date>]`
pub async fn active<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ActiveParams>,
) -> Result<Json<Vec<FeedRow>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let rows = state.catalog.active_visits(params.as_of).await?;
  Ok(Json(rows))
}

/// `GET /visits/longest-absent[?page=<n>&size=<n>]`
pub async fn longest_absent<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<AbsentRow>>, ApiError>
where
  S: CatalogStore + 'static,
{
  let page = state
    .catalog
    .longest_absent(params.request(ABSENT_PAGE_SIZE))
    .await?;
  Ok(Json(page))
}

// ─── Single visit ─────────────────────────────────────────────────────────────

/// `GET /visits/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<VisitId>,
) -> Result<Json<VisitView>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(state.catalog.get_visit(id).await?))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /visits` with a [`NewVisit`] body
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewVisit>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore + 'static,
{
  let view = state.catalog.create_visit(body).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `PUT /visits/:id` with a [`VisitPatch`] body; absent fields are unchanged
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<VisitId>,
  Json(patch): Json<VisitPatch>,
) -> Result<Json<VisitView>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(state.catalog.update_visit(id, patch).await?))
}

/// `DELETE /visits/:id`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<VisitId>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
{
  state.catalog.delete_visit(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
