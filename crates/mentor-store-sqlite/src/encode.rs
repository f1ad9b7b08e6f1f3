//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with fixed microsecond precision so that
//! they sort lexically. Calendar dates are `YYYY-MM-DD`. Responses and
//! respondents are compact JSON. UUIDs are hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use mentor_core::{
  assessment::{Assessment, AssessmentLink, Respondent},
  plan::{ActionItem, ActionPlan},
  school::School,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

/// Parse a status code stored via the enum's `AsRef<str>` form.
pub fn decode_code<T: FromStr>(column: &'static str, s: String) -> Result<T> {
  s.parse().map_err(|_| Error::InvalidValue { column, value: s })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `schools` row.
pub struct RawSchool {
  pub school_id:     String,
  pub name:          String,
  pub county:        Option<String>,
  pub town:          Option<String>,
  pub head_teacher:  Option<String>,
  pub student_count: Option<u32>,
  pub staff_count:   Option<u32>,
  pub created_at:    String,
}

impl RawSchool {
  pub const COLUMNS: &'static str =
    "school_id, name, county, town, head_teacher, student_count, staff_count, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      school_id:     row.get(0)?,
      name:          row.get(1)?,
      county:        row.get(2)?,
      town:          row.get(3)?,
      head_teacher:  row.get(4)?,
      student_count: row.get(5)?,
      staff_count:   row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      school_id:     decode_uuid(&self.school_id)?,
      name:          self.name,
      county:        self.county,
      town:          self.town,
      head_teacher:  self.head_teacher,
      student_count: self.student_count,
      staff_count:   self.staff_count,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `assessments` row.
pub struct RawAssessment {
  pub assessment_id:   String,
  pub school_id:       String,
  pub respondent:      String,
  pub assessment_date: String,
  pub status:          String,
  pub responses_json:  String,
  pub overall_score:   Option<f64>,
  pub notes:           Option<String>,
  pub created_at:      String,
}

impl RawAssessment {
  pub const COLUMNS: &'static str = "assessment_id, school_id, respondent, assessment_date, status, \
                             responses_json, overall_score, notes, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assessment_id:   row.get(0)?,
      school_id:       row.get(1)?,
      respondent:      row.get(2)?,
      assessment_date: row.get(3)?,
      status:          row.get(4)?,
      responses_json:  row.get(5)?,
      overall_score:   row.get(6)?,
      notes:           row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_assessment(self) -> Result<Assessment> {
    let respondent: Respondent = serde_json::from_str(&self.respondent)?;
    Ok(Assessment {
      assessment_id: decode_uuid(&self.assessment_id)?,
      school_id: decode_uuid(&self.school_id)?,
      respondent,
      assessment_date: decode_date(&self.assessment_date)?,
      status: decode_code("assessments.status", self.status)?,
      responses: serde_json::from_str(&self.responses_json)?,
      overall_score: self.overall_score,
      notes: self.notes,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `assessment_links` row.
pub struct RawLink {
  pub link_id:    String,
  pub school_id:  String,
  pub created_by: String,
  pub token:      String,
  pub expires_at: String,
  pub created_at: String,
}

impl RawLink {
  pub const COLUMNS: &'static str = "link_id, school_id, created_by, token, expires_at, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:    row.get(0)?,
      school_id:  row.get(1)?,
      created_by: row.get(2)?,
      token:      row.get(3)?,
      expires_at: row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_link(self) -> Result<AssessmentLink> {
    Ok(AssessmentLink {
      link_id:    decode_uuid(&self.link_id)?,
      school_id:  decode_uuid(&self.school_id)?,
      created_by: decode_uuid(&self.created_by)?,
      token:      self.token,
      expires_at: decode_dt(&self.expires_at)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `action_plans` row.
pub struct RawPlan {
  pub plan_id:       String,
  pub school_id:     String,
  pub assessment_id: Option<String>,
  pub created_by:    Option<String>,
  pub title:         String,
  pub description:   Option<String>,
  pub start_date:    Option<String>,
  pub end_date:      Option<String>,
  pub status:        String,
  pub created_at:    String,
}

impl RawPlan {
  pub const COLUMNS: &'static str = "plan_id, school_id, assessment_id, created_by, title, description, \
                             start_date, end_date, status, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:       row.get(0)?,
      school_id:     row.get(1)?,
      assessment_id: row.get(2)?,
      created_by:    row.get(3)?,
      title:         row.get(4)?,
      description:   row.get(5)?,
      start_date:    row.get(6)?,
      end_date:      row.get(7)?,
      status:        row.get(8)?,
      created_at:    row.get(9)?,
    })
  }

  pub fn into_plan(self) -> Result<ActionPlan> {
    Ok(ActionPlan {
      plan_id:       decode_uuid(&self.plan_id)?,
      school_id:     decode_uuid(&self.school_id)?,
      assessment_id: decode_opt_uuid(self.assessment_id)?,
      created_by:    decode_opt_uuid(self.created_by)?,
      title:         self.title,
      description:   self.description,
      start_date:    decode_opt_date(self.start_date)?,
      end_date:      decode_opt_date(self.end_date)?,
      status:        decode_code("action_plans.status", self.status)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `action_items` row.
pub struct RawItem {
  pub item_id:        String,
  pub plan_id:        String,
  pub domain:         String,
  pub description:    String,
  pub owner_name:     Option<String>,
  pub kpi:            Option<String>,
  pub priority:       Option<u8>,
  pub status:         String,
  pub due_date:       Option<String>,
  pub completed_date: Option<String>,
  pub notes:          Option<String>,
  pub created_at:     String,
}

impl RawItem {
  pub const COLUMNS: &'static str = "item_id, plan_id, domain, description, owner_name, kpi, priority, \
                             status, due_date, completed_date, notes, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:        row.get(0)?,
      plan_id:        row.get(1)?,
      domain:         row.get(2)?,
      description:    row.get(3)?,
      owner_name:     row.get(4)?,
      kpi:            row.get(5)?,
      priority:       row.get(6)?,
      status:         row.get(7)?,
      due_date:       row.get(8)?,
      completed_date: row.get(9)?,
      notes:          row.get(10)?,
      created_at:     row.get(11)?,
    })
  }

  pub fn into_item(self) -> Result<ActionItem> {
    Ok(ActionItem {
      item_id:        decode_uuid(&self.item_id)?,
      plan_id:        decode_uuid(&self.plan_id)?,
      domain:         self.domain,
      description:    self.description,
      owner_name:     self.owner_name,
      kpi:            self.kpi,
      priority:       self.priority,
      status:         decode_code("action_items.status", self.status)?,
      due_date:       decode_opt_date(self.due_date)?,
      completed_date: decode_opt_date(self.completed_date)?,
      notes:          self.notes,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}
