//! Growth, comparison and risk-alert views.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/schools/{id}/growth` | 422 with fewer than 2 completed assessments |
//! | `GET`  | `/schools/{id}/compare?ids=a,b` | 2–4 ids of the school's assessments, else 422 |
//! | `GET`  | `/alerts` | `{summary, alerts}`, most severe first |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::Utc;
use mentor_core::{
  alerts::{AlertSummary, RiskAlert, detect_risk_alerts},
  assessment::AssessmentStatus,
  growth::{Comparison, GrowthReport, compare, growth_report},
  store::MentorStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, assessments::require_assessment, error::ApiError, schools::require_school};

// ─── Growth ──────────────────────────────────────────────────────────────────

/// `GET /schools/{id}/growth`
pub async fn growth<S>(
  State(state): State<ApiState<S>>,
  Path(school_id): Path<Uuid>,
) -> Result<Json<GrowthReport>, ApiError>
where
  S: MentorStore + 'static,
{
  require_school(state.store.as_ref(), school_id).await?;
  let completed = state
    .store
    .list_assessments(school_id, Some(AssessmentStatus::Completed))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(growth_report(&state.taxonomy, &completed)?))
}

// ─── Compare ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompareParams {
  /// Comma-separated assessment ids, in column order.
  #[serde(default)]
  pub ids: String,
}

fn parse_ids(raw: &str) -> Result<Vec<Uuid>, ApiError> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid assessment id {s:?}")))
    })
    .collect()
}

/// `GET /schools/{id}/compare?ids=<id>,<id>[,...]`
pub async fn comparison<S>(
  State(state): State<ApiState<S>>,
  Path(school_id): Path<Uuid>,
  Query(params): Query<CompareParams>,
) -> Result<Json<Comparison>, ApiError>
where
  S: MentorStore + 'static,
{
  require_school(state.store.as_ref(), school_id).await?;

  let mut selected = Vec::new();
  for id in parse_ids(&params.ids)? {
    let assessment = require_assessment(state.store.as_ref(), id).await?;
    if assessment.school_id != school_id {
      return Err(ApiError::NotFound(format!(
        "assessment {id} not found for school {school_id}"
      )));
    }
    selected.push(assessment);
  }

  Ok(Json(compare(&state.taxonomy, &selected)?))
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsView {
  pub summary: AlertSummary,
  pub alerts:  Vec<RiskAlert>,
}

/// `GET /alerts`
pub async fn alerts<S>(State(state): State<ApiState<S>>) -> Result<Json<AlertsView>, ApiError>
where
  S: MentorStore + 'static,
{
  let alerts = detect_risk_alerts(
    state.store.as_ref(),
    &state.taxonomy,
    &state.policy,
    Utc::now().date_naive(),
  )
  .await
  .map_err(ApiError::store)?;
  Ok(Json(AlertsView { summary: AlertSummary::of(&alerts), alerts }))
}
