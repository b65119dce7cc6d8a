//! Handlers for `/souls` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/souls/:id` | Soul detail with images and visits; 404 if not found |
//! | `GET`  | `/souls/:id/visits` | Ordered by visit number; 404 if the soul is unknown |

use axum::{
  Json,
  extract::{Path, State},
};
use planner_core::{
  SoulId,
  project::{SoulView, VisitView},
  store::CatalogStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /souls/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<SoulId>,
) -> Result<Json<SoulView>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(state.catalog.get_soul(id).await?))
}

/// `GET /souls/:id/visits`
pub async fn visits<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<SoulId>,
) -> Result<Json<Vec<VisitView>>, ApiError>
where
  S: CatalogStore + 'static,
{
  Ok(Json(state.catalog.visits_for_soul(id).await?))
}
