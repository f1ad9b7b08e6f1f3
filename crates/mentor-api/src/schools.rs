//! Handlers for `/schools` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schools` | Ordered by name |
//! | `POST` | `/schools` | Body: [`NewSchool`]; `name` required |
//! | `GET`  | `/schools/{id}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mentor_core::{
  school::{NewSchool, School},
  store::MentorStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// Load a school or fail with 404.
pub(crate) async fn require_school<S: MentorStore>(store: &S, id: Uuid) -> Result<School, ApiError> {
  store
    .get_school(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("school {id} not found")))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /schools`
pub async fn list<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<School>>, ApiError>
where
  S: MentorStore + 'static,
{
  let schools = state.store.list_schools().await.map_err(ApiError::store)?;
  Ok(Json(schools))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /schools`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(mut body): Json<NewSchool>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MentorStore + 'static,
{
  body.name = body.name.trim().to_owned();
  if body.name.is_empty() {
    return Err(ApiError::BadRequest("school name is required".into()));
  }

  let school = state.store.add_school(body).await.map_err(ApiError::store)?;
  tracing::info!(school_id = %school.school_id, name = %school.name, "school created");
  Ok((StatusCode::CREATED, Json(school)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /schools/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<School>, ApiError>
where
  S: MentorStore + 'static,
{
  Ok(Json(require_school(state.store.as_ref(), id).await?))
}
