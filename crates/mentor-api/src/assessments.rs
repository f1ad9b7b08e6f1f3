//! Handlers for assessments and self-assessment links.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/taxonomy` | The live taxonomy |
//! | `GET`    | `/schools/{id}/assessments` | Oldest first; optional `?status=draft\|completed` |
//! | `POST`   | `/schools/{id}/assessments` | Mentor-conducted; body: [`CreateBody`] |
//! | `POST`   | `/schools/{id}/assessment-links` | Mentor/admin only |
//! | `POST`   | `/assessments/public` | Token self-assessment; 404 unknown token, 410 expired |
//! | `GET`    | `/assessments/{id}` | 404 if not found |
//! | `DELETE` | `/assessments/{id}` | Mentor/admin only; 204 |
//! | `GET`    | `/assessments/{id}/suggested-actions` | Template engine output |
//!
//! Scores sent by clients are never trusted: domain and overall scores are
//! recomputed from the question scores before anything is stored.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use mentor_core::{
  assessment::{
    Assessment, AssessmentLink, AssessmentResponses, AssessmentStatus, NewAssessment, Respondent,
  },
  scoring::{DomainSummary, summarize_domains},
  store::MentorStore,
  taxonomy::{Taxonomy, TaxonomyMismatch},
  templates::{SuggestedAction, priority_domains, suggested_actions},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, auth::Actor, error::ApiError, schools::require_school};

/// Load an assessment or fail with 404.
pub(crate) async fn require_assessment<S: MentorStore>(
  store: &S,
  id: Uuid,
) -> Result<Assessment, ApiError> {
  store
    .get_assessment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("assessment {id} not found")))
}

/// Reject question scores outside 1..=5.
fn validate_responses(responses: &AssessmentResponses) -> Result<(), ApiError> {
  for (code, domain) in responses.iter() {
    if let Some((qid, q)) = domain.questions.iter().find(|(_, q)| !q.is_valid()) {
      return Err(ApiError::BadRequest(format!(
        "{code}/{qid}: score {} is outside 1-5",
        q.score
      )));
    }
  }
  Ok(())
}

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// `GET /taxonomy`
pub async fn taxonomy<S>(State(state): State<ApiState<S>>) -> Json<Taxonomy>
where
  S: MentorStore + 'static,
{
  Json(state.taxonomy.as_ref().clone())
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<AssessmentStatus>,
}

/// `GET /schools/{id}/assessments[?status=<status>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Path(school_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Assessment>>, ApiError>
where
  S: MentorStore + 'static,
{
  require_school(state.store.as_ref(), school_id).await?;
  let assessments = state
    .store
    .list_assessments(school_id, params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(assessments))
}

// ─── Create (mentor) ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// Defaults to today.
  pub assessment_date: Option<NaiveDate>,
  pub status:          AssessmentStatus,
  pub responses:       AssessmentResponses,
  pub notes:           Option<String>,
}

/// `POST /schools/{id}/assessments`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Path(school_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MentorStore + 'static,
{
  require_school(state.store.as_ref(), school_id).await?;
  validate_responses(&body.responses)?;

  let input = NewAssessment::new(
    school_id,
    Respondent::Mentor { user_id: actor.user_id },
    body.assessment_date.unwrap_or_else(|| Utc::now().date_naive()),
    body.status,
    body.responses,
    body.notes,
  );
  let assessment = state.store.record_assessment(input).await.map_err(ApiError::store)?;

  if let Some(m) = state.taxonomy.mismatch(&assessment) {
    tracing::warn!(assessment_id = %m.assessment_id, codes = ?m.unknown_codes, "responses use unknown domain codes");
  }
  tracing::info!(
    assessment_id = %assessment.assessment_id,
    school_id = %school_id,
    status = %assessment.status,
    overall = assessment.overall_or_zero(),
    "assessment recorded"
  );
  Ok((StatusCode::CREATED, Json(assessment)))
}

// ─── Self-assessment links ───────────────────────────────────────────────────

/// `POST /schools/{id}/assessment-links`
pub async fn create_link<S>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Path(school_id): Path<Uuid>,
) -> Result<(StatusCode, Json<AssessmentLink>), ApiError>
where
  S: MentorStore + 'static,
{
  actor.require_manager()?;
  require_school(state.store.as_ref(), school_id).await?;

  let expires_at = Utc::now() + state.link_ttl;
  let link = state
    .store
    .create_assessment_link(school_id, actor.user_id, expires_at)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(link_id = %link.link_id, school_id = %school_id, %expires_at, "assessment link created");
  Ok((StatusCode::CREATED, Json(link)))
}

#[derive(Debug, Deserialize)]
pub struct PublicBody {
  pub token:           String,
  pub respondent_name: String,
  pub respondent_role: String,
  pub assessment_date: Option<NaiveDate>,
  pub responses:       AssessmentResponses,
  pub notes:           Option<String>,
}

/// `POST /assessments/public`
pub async fn submit_public<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<PublicBody>,
) -> Result<(StatusCode, Json<Assessment>), ApiError>
where
  S: MentorStore + 'static,
{
  let link = state
    .store
    .find_assessment_link(&body.token)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("assessment link not found".into()))?;
  if link.is_expired(Utc::now()) {
    return Err(ApiError::Gone("assessment link has expired".into()));
  }

  let name = body.respondent_name.trim();
  let role = body.respondent_role.trim();
  if name.is_empty() || role.is_empty() {
    return Err(ApiError::BadRequest("respondent name and role are required".into()));
  }
  validate_responses(&body.responses)?;

  let input = NewAssessment::new(
    link.school_id,
    Respondent::SelfAssessment {
      link_id: link.link_id,
      name:    name.to_owned(),
      role:    role.to_owned(),
    },
    body.assessment_date.unwrap_or_else(|| Utc::now().date_naive()),
    AssessmentStatus::Completed,
    body.responses,
    body.notes,
  );
  let assessment = state.store.record_assessment(input).await.map_err(ApiError::store)?;
  tracing::info!(
    assessment_id = %assessment.assessment_id,
    link_id = %link.link_id,
    "self-assessment submitted"
  );
  Ok((StatusCode::CREATED, Json(assessment)))
}

// ─── Get / delete ────────────────────────────────────────────────────────────

/// `GET /assessments/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Assessment>, ApiError>
where
  S: MentorStore + 'static,
{
  Ok(Json(require_assessment(state.store.as_ref(), id).await?))
}

/// `DELETE /assessments/{id}`
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: MentorStore + 'static,
{
  actor.require_manager()?;
  let deleted = state.store.delete_assessment(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("assessment {id} not found")));
  }
  tracing::info!(assessment_id = %id, user_id = %actor.user_id, "assessment deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Suggestions ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsView {
  pub assessment_id:    Uuid,
  /// Domain codes scoring below 4, worst first.
  pub priority_domains: Vec<String>,
  pub actions:          Vec<SuggestedAction>,
  pub domains:          Vec<DomainSummary>,
  /// Scored codes outside the live taxonomy. They are still ranked above.
  pub mismatch:         Option<TaxonomyMismatch>,
}

/// `GET /assessments/{id}/suggested-actions`
pub async fn suggestions<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SuggestionsView>, ApiError>
where
  S: MentorStore + 'static,
{
  let assessment = require_assessment(state.store.as_ref(), id).await?;
  Ok(Json(SuggestionsView {
    assessment_id:    id,
    priority_domains: priority_domains(&state.taxonomy, &assessment.responses),
    actions:          suggested_actions(&state.taxonomy, &state.templates, &assessment.responses),
    domains:          summarize_domains(&state.taxonomy, &assessment.responses),
    mismatch:         state.taxonomy.mismatch(&assessment),
  }))
}
