//! Action plans and their items.
//!
//! A plan and its items are created together from template suggestions; after
//! that only item statuses (and the plan status) change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{assessment::Assessment, templates::SuggestedAction};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionPlanStatus {
  Draft,
  Active,
  Completed,
  Archived,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionItemStatus {
  Pending,
  InProgress,
  Completed,
  Blocked,
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
  pub plan_id:       Uuid,
  pub school_id:     Uuid,
  /// The assessment the plan was generated from; cleared if it is deleted.
  pub assessment_id: Option<Uuid>,
  pub created_by:    Option<Uuid>,
  pub title:         String,
  pub description:   Option<String>,
  pub start_date:    Option<NaiveDate>,
  pub end_date:      Option<NaiveDate>,
  pub status:        ActionPlanStatus,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
  pub item_id:        Uuid,
  pub plan_id:        Uuid,
  pub domain:         String,
  pub description:    String,
  pub owner_name:     Option<String>,
  pub kpi:            Option<String>,
  pub priority:       Option<u8>,
  pub status:         ActionItemStatus,
  pub due_date:       Option<NaiveDate>,
  /// Set when the item moves to `completed`, cleared when it moves away.
  pub completed_date: Option<NaiveDate>,
  pub notes:          Option<String>,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlanWithItems {
  #[serde(flatten)]
  pub plan:  ActionPlan,
  pub items: Vec<ActionItem>,
}

impl ActionPlanWithItems {
  pub fn tally(&self) -> ItemTally { ItemTally::of(&self.items) }
}

/// Item counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTally {
  pub total:       usize,
  pub pending:     usize,
  pub in_progress: usize,
  pub completed:   usize,
  pub blocked:     usize,
}

impl ItemTally {
  pub fn of(items: &[ActionItem]) -> Self {
    items.iter().fold(Self::default(), |mut t, item| {
      t.total += 1;
      match item.status {
        ActionItemStatus::Pending => t.pending += 1,
        ActionItemStatus::InProgress => t.in_progress += 1,
        ActionItemStatus::Completed => t.completed += 1,
        ActionItemStatus::Blocked => t.blocked += 1,
      }
      t
    })
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::MentorStore::create_plan_with_items`].
#[derive(Debug, Clone)]
pub struct NewActionPlan {
  pub school_id:     Uuid,
  pub assessment_id: Option<Uuid>,
  pub created_by:    Option<Uuid>,
  pub title:         String,
  pub description:   Option<String>,
  pub start_date:    Option<NaiveDate>,
  pub end_date:      Option<NaiveDate>,
  pub status:        ActionPlanStatus,
}

impl NewActionPlan {
  /// An active plan generated from `assessment`, starting `today`.
  pub fn from_assessment(
    assessment: &Assessment,
    created_by: Option<Uuid>,
    today: NaiveDate,
  ) -> Self {
    Self {
      school_id: assessment.school_id,
      assessment_id: Some(assessment.assessment_id),
      created_by,
      title: format!("Action Plan - {today}"),
      description: Some("Generated from health check assessment".to_owned()),
      start_date: Some(today),
      end_date: None,
      status: ActionPlanStatus::Active,
    }
  }
}

#[derive(Debug, Clone)]
pub struct NewActionItem {
  pub domain:      String,
  pub description: String,
  pub owner_name:  Option<String>,
  pub kpi:         Option<String>,
  pub priority:    Option<u8>,
  pub due_date:    Option<NaiveDate>,
}

impl From<SuggestedAction> for NewActionItem {
  fn from(a: SuggestedAction) -> Self {
    Self {
      domain:      a.domain,
      description: a.description,
      owner_name:  Some(a.owner_name).filter(|s| !s.is_empty()),
      kpi:         Some(a.kpi).filter(|s| !s.is_empty()),
      priority:    Some(a.priority),
      due_date:    None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(status: ActionItemStatus) -> ActionItem {
    ActionItem {
      item_id: Uuid::new_v4(),
      plan_id: Uuid::nil(),
      domain: "FINANCE".into(),
      description: "Reconcile cashbook".into(),
      owner_name: None,
      kpi: None,
      priority: Some(1),
      status,
      due_date: None,
      completed_date: None,
      notes: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn tally_counts_each_status() {
    use ActionItemStatus::*;
    let items: Vec<_> = [Pending, Pending, InProgress, Completed, Blocked, Completed]
      .into_iter()
      .map(item)
      .collect();
    assert_eq!(ItemTally::of(&items), ItemTally {
      total:       6,
      pending:     2,
      in_progress: 1,
      completed:   2,
      blocked:     1,
    });
  }

  #[test]
  fn suggestion_becomes_item_with_empty_fields_dropped() {
    let item = NewActionItem::from(SuggestedAction {
      domain:      "CULTURE".into(),
      description: "Hold a parent meeting".into(),
      owner_name:  "Headteacher".into(),
      kpi:         String::new(),
      priority:    2,
    });
    assert_eq!(item.owner_name.as_deref(), Some("Headteacher"));
    assert_eq!(item.kpi, None);
    assert_eq!(item.priority, Some(2));
  }

  #[test]
  fn status_strings_are_snake_case() {
    assert_eq!(ActionItemStatus::InProgress.to_string(), "in_progress");
    assert_eq!(
      "archived".parse::<ActionPlanStatus>().unwrap(),
      ActionPlanStatus::Archived
    );
    let json = serde_json::to_string(&ActionItemStatus::InProgress).unwrap();
    assert_eq!(json, "\"in_progress\"");
  }
}
