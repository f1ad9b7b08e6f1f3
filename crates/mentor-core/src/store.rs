//! Persistence traits.
//!
//! [`AlertSource`] is the narrow read interface the risk detector needs;
//! [`MentorStore`] extends it with everything the API layer uses. Backends
//! (e.g. `mentor-store-sqlite`) implement both. Authorization is the caller's
//! job: write methods assume the caller's role has already been checked.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  assessment::{Assessment, AssessmentLink, AssessmentStatus, NewAssessment},
  plan::{
    ActionItem, ActionItemStatus, ActionPlan, ActionPlanStatus, ActionPlanWithItems,
    NewActionItem, NewActionPlan,
  },
  school::{NewSchool, School},
};

// ─── Alert source ────────────────────────────────────────────────────────────

/// The lookups behind one risk-detection pass.
///
/// Each method maps to one query per school; a backend may batch them behind
/// this interface without changing the alert rules.
pub trait AlertSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_schools(
    &self,
  ) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  /// The most recent completed assessment by `assessment_date`.
  fn latest_completed(
    &self,
    school_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assessment>, Self::Error>> + Send + '_;

  /// The completed assessment immediately before the latest one.
  fn previous_completed(
    &self,
    school_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assessment>, Self::Error>> + Send + '_;

  /// Number of plans with status `active`.
  fn active_plan_count(
    &self,
    school_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Full store ──────────────────────────────────────────────────────────────

pub trait MentorStore: AlertSource {
  // ── Schools ───────────────────────────────────────────────────────────

  fn add_school(
    &self,
    input: NewSchool,
  ) -> impl Future<Output = Result<School, Self::Error>> + Send + '_;

  fn get_school(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  // ── Assessments ───────────────────────────────────────────────────────

  /// Persist a new assessment. `assessment_id` and `created_at` are assigned
  /// by the store.
  fn record_assessment(
    &self,
    input: NewAssessment,
  ) -> impl Future<Output = Result<Assessment, Self::Error>> + Send + '_;

  fn get_assessment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Assessment>, Self::Error>> + Send + '_;

  /// Assessments of a school, oldest first, optionally filtered by status.
  fn list_assessments(
    &self,
    school_id: Uuid,
    status: Option<AssessmentStatus>,
  ) -> impl Future<Output = Result<Vec<Assessment>, Self::Error>> + Send + '_;

  /// Delete an assessment. Returns `false` if it did not exist. Plans
  /// generated from it are kept but lose the link.
  fn delete_assessment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Self-assessment links ─────────────────────────────────────────────

  /// Mint a share link with a fresh random token.
  fn create_assessment_link(
    &self,
    school_id: Uuid,
    created_by: Uuid,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<AssessmentLink, Self::Error>> + Send + '_;

  fn find_assessment_link<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<AssessmentLink>, Self::Error>> + Send + 'a;

  // ── Action plans ──────────────────────────────────────────────────────

  /// Create a plan and all of its items as one unit: either both are
  /// persisted or neither is.
  fn create_plan_with_items(
    &self,
    plan: NewActionPlan,
    items: Vec<NewActionItem>,
  ) -> impl Future<Output = Result<ActionPlanWithItems, Self::Error>> + Send + '_;

  fn get_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ActionPlanWithItems>, Self::Error>> + Send + '_;

  /// Plans of a school, newest first, optionally filtered by status.
  fn list_plans(
    &self,
    school_id: Uuid,
    status: Option<ActionPlanStatus>,
  ) -> impl Future<Output = Result<Vec<ActionPlan>, Self::Error>> + Send + '_;

  /// Change one item's status. `completed_date` becomes `today` when the new
  /// status is `completed` and is cleared otherwise. Returns `None` if the
  /// item does not belong to `plan_id`.
  fn update_item_status(
    &self,
    plan_id: Uuid,
    item_id: Uuid,
    status: ActionItemStatus,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Option<ActionItem>, Self::Error>> + Send + '_;
}
