//! Handlers for action plans.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/assessments/{id}/plans` | Mentor/admin; plan + items from the templates, atomically |
//! | `GET`   | `/schools/{id}/plans` | Newest first; optional `?status=` |
//! | `GET`   | `/plans/{id}` | Plan, items and per-status tally |
//! | `PATCH` | `/plans/{id}/items/{item_id}` | Body: `{"status":"completed"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::Utc;
use mentor_core::{
  plan::{
    ActionItem, ActionItemStatus, ActionPlan, ActionPlanStatus, ActionPlanWithItems, ItemTally,
    NewActionItem, NewActionPlan,
  },
  store::MentorStore,
  templates::suggested_actions,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  ApiState, assessments::require_assessment, auth::Actor, error::ApiError,
  schools::require_school,
};

/// A plan with its items and their status counts.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanView {
  #[serde(flatten)]
  pub plan:  ActionPlanWithItems,
  pub tally: ItemTally,
}

impl From<ActionPlanWithItems> for PlanView {
  fn from(plan: ActionPlanWithItems) -> Self {
    let tally = plan.tally();
    Self { plan, tally }
  }
}

// ─── Generate ────────────────────────────────────────────────────────────────

/// `POST /assessments/{id}/plans`
pub async fn create_from_assessment<S>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Path(assessment_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PlanView>), ApiError>
where
  S: MentorStore + 'static,
{
  actor.require_manager()?;
  let assessment = require_assessment(state.store.as_ref(), assessment_id).await?;
  if !assessment.is_completed() {
    return Err(ApiError::Unprocessable(
      "plans can only be generated from completed assessments".into(),
    ));
  }

  let items: Vec<NewActionItem> =
    suggested_actions(&state.taxonomy, &state.templates, &assessment.responses)
      .into_iter()
      .map(NewActionItem::from)
      .collect();
  let plan = NewActionPlan::from_assessment(
    &assessment,
    Some(actor.user_id),
    Utc::now().date_naive(),
  );

  let created = state
    .store
    .create_plan_with_items(plan, items)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    plan_id = %created.plan.plan_id,
    assessment_id = %assessment_id,
    items = created.items.len(),
    "action plan generated"
  );
  Ok((StatusCode::CREATED, Json(created.into())))
}

// ─── List / get ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<ActionPlanStatus>,
}

/// `GET /schools/{id}/plans[?status=<status>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Path(school_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ActionPlan>>, ApiError>
where
  S: MentorStore + 'static,
{
  require_school(state.store.as_ref(), school_id).await?;
  let plans = state
    .store
    .list_plans(school_id, params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(plans))
}

/// `GET /plans/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PlanView>, ApiError>
where
  S: MentorStore + 'static,
{
  let plan = state
    .store
    .get_plan(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("plan {id} not found")))?;
  Ok(Json(plan.into()))
}

// ─── Item status ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ItemStatusBody {
  pub status: ActionItemStatus,
}

/// `PATCH /plans/{id}/items/{item_id}`
pub async fn update_item<S>(
  State(state): State<ApiState<S>>,
  actor: Actor,
  Path((plan_id, item_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ItemStatusBody>,
) -> Result<Json<ActionItem>, ApiError>
where
  S: MentorStore + 'static,
{
  let item = state
    .store
    .update_item_status(plan_id, item_id, body.status, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("item {item_id} not found in plan {plan_id}")))?;
  tracing::info!(
    plan_id = %plan_id,
    item_id = %item_id,
    status = %item.status,
    user_id = %actor.user_id,
    "action item updated"
  );
  Ok(Json(item))
}
