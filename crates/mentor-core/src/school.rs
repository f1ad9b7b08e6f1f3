//! Schools — the unit every assessment, plan and alert belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
  pub school_id:     Uuid,
  pub name:          String,
  pub county:        Option<String>,
  pub town:          Option<String>,
  pub head_teacher:  Option<String>,
  pub student_count: Option<u32>,
  pub staff_count:   Option<u32>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::MentorStore::add_school`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSchool {
  pub name:          String,
  pub county:        Option<String>,
  pub town:          Option<String>,
  pub head_teacher:  Option<String>,
  pub student_count: Option<u32>,
  pub staff_count:   Option<u32>,
}

impl NewSchool {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Self::default() }
  }
}
